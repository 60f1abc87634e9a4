use std::ffi::OsString;

use clap::{error::ErrorKind, CommandFactory, Parser};

/// Run one of the registered spiders.
#[derive(Parser, Debug)]
pub(crate) struct CrawlArgs {
    /// List available spiders
    #[arg(short, long)]
    pub list: bool,

    /// Name of the spider to run
    #[arg(required_unless_present = "list", value_name = "SPIDER")]
    pub spider: Option<String>,

    /// Options for the crawling engine, passed on untouched
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ENGINE_ARGS")]
    pub engine_args: Vec<String>,
}

/// What the command line asks the launcher to do.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Invocation {
    List,
    Crawl {
        spider: String,
        engine_args: Vec<String>,
    },
}

/// Parses `argv`, handing every argument the launcher does not own to the engine.
///
/// Only `-l/--list`, `-h/--help` and the spider name belong to the launcher,
/// wherever they appear before the name. Other options may come before or after
/// the name and keep their order. Since engine options are opaque, the name is
/// the first bare word naming a spider in `is_spider`; failing that, the first
/// bare word not following an option, then the first bare word at all.
pub(crate) fn parse<I, T, P>(argv: I, is_spider: P) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
    P: Fn(&str) -> bool,
{
    let mut argv = argv.into_iter().map(Into::into);
    let mut own: Vec<OsString> = argv.next().into_iter().collect();
    let rest: Vec<OsString> = argv.collect();

    let spider = spider_position(&rest, is_spider);
    let mut leading = Vec::new();
    for (index, arg) in rest.into_iter().enumerate() {
        match spider {
            Some(position) if index >= position => own.push(arg),
            _ if is_launcher_flag(&arg) => own.push(arg),
            _ => leading.push(arg.to_string_lossy().into_owned()),
        }
    }

    let args = CrawlArgs::try_parse_from(own)?;
    if args.list {
        return Ok(Invocation::List);
    }
    let Some(spider) = args.spider else {
        return Err(CrawlArgs::command().error(
            ErrorKind::MissingRequiredArgument,
            "the name of the spider to run is required",
        ));
    };
    leading.extend(args.engine_args);
    Ok(Invocation::Crawl {
        spider,
        engine_args: leading,
    })
}

fn is_launcher_flag(arg: &OsString) -> bool {
    matches!(arg.to_str(), Some("-l" | "--list" | "-h" | "--help"))
}

fn bare_word(arg: &OsString) -> Option<&str> {
    arg.to_str().filter(|arg| !arg.starts_with('-'))
}

/// True when `args[index]` may be the value of the option before it.
fn follows_option(args: &[OsString], index: usize) -> bool {
    index > 0
        && args[index - 1]
            .to_str()
            .is_some_and(|prev| prev.starts_with('-') && !prev.contains('='))
        && !is_launcher_flag(&args[index - 1])
}

fn spider_position<P: Fn(&str) -> bool>(args: &[OsString], is_spider: P) -> Option<usize> {
    let bare = |index: &usize| bare_word(&args[*index]).is_some();
    (0..args.len())
        .find(|index| bare_word(&args[*index]).is_some_and(|word| is_spider(word)))
        .or_else(|| (0..args.len()).find(|index| bare(index) && !follows_option(args, *index)))
        .or_else(|| (0..args.len()).find(bare))
}
