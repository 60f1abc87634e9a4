//! Command line entry point running registered spiders through an [`Engine`].
//!
//! ```rust,ignore
//! register_spider(spider_one);
//! register_spider(spider_two);
//!
//! #[tokio::main]
//! async fn main() {
//!     std::process::exit(run_crawler(MyEngine::new(), Settings::new()).await);
//! }
//! ```
//!
//! `crawler -l` lists the registered spiders, `crawler <spider> [ENGINE_ARGS]...`
//! runs one. Engine options may also come before the spider name and reach the
//! engine in their original order. Unknown spider names are rejected before the
//! engine is started.

mod cli;

use std::{
    ffi::OsString,
    future::Future,
    io::{self, Write},
    sync::Arc,
};

use tokio::{signal, time::Instant};

use crate::engine::{Engine, EngineConfig, Settings, SpiderSource};
use crate::error::Error;
use crate::registry::SpiderRegistry;
use crate::spider::SpiderDefinition;
use cli::Invocation;

/// Exit code for a spider name missing from the registry.
pub const EXIT_SPIDER_NOT_FOUND: i32 = 1;

pub struct Launcher<E> {
    engine: E,
    registry: Arc<SpiderRegistry>,
    settings: Settings,
}

impl<E: Engine> Launcher<E> {
    /// A launcher serving the process-wide registry.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            registry: SpiderRegistry::global(),
            settings: Settings::default(),
        }
    }

    pub fn with_registry(mut self, registry: Arc<SpiderRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &Arc<SpiderRegistry> {
        &self.registry
    }

    pub async fn run<I, T>(&self, argv: I) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        self.run_until(argv, std::future::pending::<()>()).await
    }

    /// Like [`run`](Self::run); the engine is asked to stop once `shutdown` resolves.
    pub async fn run_until<I, T, S>(&self, argv: I, shutdown: S) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
        S: Future,
    {
        self.run_with_output(argv, shutdown, &mut io::stdout(), &mut io::stderr())
            .await
    }

    pub async fn run_with_output<I, T, S, O, W>(
        &self,
        argv: I,
        shutdown: S,
        out: &mut O,
        err: &mut W,
    ) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
        S: Future,
        O: Write,
        W: Write,
    {
        let invocation = match cli::parse(argv, |name| self.registry.contains(name)) {
            Ok(invocation) => invocation,
            Err(error) => {
                let rendered = error.render();
                if error.use_stderr() {
                    let _ = write!(err, "{}", rendered);
                } else {
                    let _ = write!(out, "{}", rendered);
                }
                return error.exit_code();
            }
        };

        let (spider, engine_args) = match invocation {
            Invocation::List => {
                for name in self.registry.list_names() {
                    let _ = writeln!(out, "{}", name);
                }
                return 0;
            }
            Invocation::Crawl {
                spider,
                engine_args,
            } => (spider, engine_args),
        };

        if !self.registry.contains(&spider) {
            let error = Error::SpiderNotFound(spider);
            tracing::error!("{}", error);
            let _ = writeln!(err, "{}", error);
            return EXIT_SPIDER_NOT_FOUND;
        }

        self.crawl(spider, engine_args, shutdown).await
    }

    /// Hands one resolved spider to the engine and waits for its exit code.
    async fn crawl<S: Future>(&self, spider: String, engine_args: Vec<String>, shutdown: S) -> i32 {
        let source: Arc<dyn SpiderSource> = self.registry.clone();
        let config = EngineConfig::new(self.settings.clone(), source);
        let token = config.shutdown.clone();

        tracing::info!("running spider '{}'", spider);
        let starting_time = Instant::now();

        let run = self.engine.execute(config, spider.clone(), engine_args);
        tokio::pin!(run);
        let exit_code = tokio::select! {
            exit_code = &mut run => exit_code,
            _ = shutdown => {
                tracing::info!(spider = %spider, "shutdown requested, waiting for the engine");
                token.cancel();
                run.await
            }
        };

        tracing::info!(
            spider = %spider,
            exit_code = exit_code,
            running_time = ?starting_time.elapsed(),
            "crawl finished"
        );
        exit_code
    }
}

/// Runs the spider named on the command line from the process-wide registry.
///
/// Ctrl-C asks the engine to stop.
pub async fn run_crawler<E: Engine>(engine: E, settings: Settings) -> i32 {
    Launcher::new(engine)
        .with_settings(settings)
        .run_until(std::env::args_os(), ctrl_c())
        .await
}

/// Runs a single spider without consulting the command line or the process-wide registry.
pub async fn run_spider<E: Engine>(engine: E, definition: SpiderDefinition, settings: Settings) -> i32 {
    let registry = Arc::new(SpiderRegistry::new());
    let name = registry.register(definition).name().to_string();
    Launcher::new(engine)
        .with_registry(registry)
        .with_settings(settings)
        .crawl(name, Vec::new(), ctrl_c())
        .await
}

async fn ctrl_c() {
    if let Err(error) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for event: {:?}", error);
        std::future::pending::<()>().await;
    }
}
