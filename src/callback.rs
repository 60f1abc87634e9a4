//! Binding free parse functions to a spider instance.
//!
//! The engine calls a [`Callback`] with nothing but the fetched [`Response`].
//! Parse functions written outside a spider still want the spider, and maybe a
//! few fixed arguments, so [`bind_callback`] and [`bind_callback_with`] close
//! over both and forward them on every call.

use std::{any::type_name, fmt, sync::Arc};

use crate::engine::{ParseResult, Response};
use crate::spider::Spider;

type CallbackFn = dyn Fn(Response) -> ParseResult + Send + Sync;
type SpiderFn = dyn Fn(&Spider, Response) -> ParseResult + Send + Sync;

/// Last path segment of a `type_name`, which for a fn item is the function's own name.
///
/// Closures have no name of their own and report the function they were written in.
fn short_name(path: &'static str) -> &'static str {
    path.rsplit("::")
        .find(|segment| !segment.starts_with("{{"))
        .unwrap_or(path)
}

/// A single-argument function of a response, as handed to the engine.
#[derive(Clone)]
pub struct Callback {
    path: &'static str,
    func: Arc<CallbackFn>,
}

impl Callback {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Response) -> ParseResult + Send + Sync + 'static,
    {
        Self {
            path: type_name::<F>(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &'static str {
        short_name(self.path)
    }

    /// Full path of the wrapped function, e.g. `crawler::parse_net`.
    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn call(&self, response: Response) -> ParseResult {
        (self.func)(response)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback").field(&self.path).finish()
    }
}

/// A parse function still waiting for its spider.
///
/// Fixed arguments, if any, are already captured.
#[derive(Clone)]
pub struct ParseFn {
    path: &'static str,
    func: Arc<SpiderFn>,
}

impl ParseFn {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Spider, Response) -> ParseResult + Send + Sync + 'static,
    {
        Self {
            path: type_name::<F>(),
            func: Arc::new(func),
        }
    }

    pub fn with_args<F, A>(func: F, args: A) -> Self
    where
        F: Fn(&Spider, Response, &A) -> ParseResult + Send + Sync + 'static,
        A: Send + Sync + 'static,
    {
        Self {
            path: type_name::<F>(),
            func: Arc::new(move |spider: &Spider, response: Response| {
                func(spider, response, &args)
            }),
        }
    }

    /// Wraps a function that takes only the response; the spider is ignored.
    pub fn response_only<F>(func: F) -> Self
    where
        F: Fn(Response) -> ParseResult + Send + Sync + 'static,
    {
        Self {
            path: type_name::<F>(),
            func: Arc::new(move |_: &Spider, response: Response| func(response)),
        }
    }

    pub fn name(&self) -> &'static str {
        short_name(self.path)
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn call(&self, spider: &Spider, response: Response) -> ParseResult {
        (self.func)(spider, response)
    }

    /// Closes over `spider`, producing the callback the engine invokes.
    pub fn bind(&self, spider: Arc<Spider>) -> Callback {
        let func = self.func.clone();
        Callback {
            path: self.path,
            func: Arc::new(move |response: Response| func(&spider, response)),
        }
    }
}

impl fmt::Debug for ParseFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ParseFn").field(&self.path).finish()
    }
}

/// Binds `parse` to `spider`: the callback calls `parse(&spider, response)`.
pub fn bind_callback<F>(parse: F, spider: Arc<Spider>) -> Callback
where
    F: Fn(&Spider, Response) -> ParseResult + Send + Sync + 'static,
{
    ParseFn::new(parse).bind(spider)
}

/// Binds `parse` to `spider` and fixed `args`: the callback calls
/// `parse(&spider, response, &args)`.
pub fn bind_callback_with<F, A>(parse: F, spider: Arc<Spider>, args: A) -> Callback
where
    F: Fn(&Spider, Response, &A) -> ParseResult + Send + Sync + 'static,
    A: Send + Sync + 'static,
{
    ParseFn::with_args(parse, args).bind(spider)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::engine::{Output, ParseOutput};
    use crate::item::RecordType;
    use crate::spider::new_spider;

    struct Page {
        number: u32,
    }

    fn parse_page(spider: &Spider, response: Response, page: &Page) -> ParseResult {
        let item = RecordType::new("spider url page")?;
        let record = item.build([
            ("spider", serde_json::json!(spider.name())),
            ("url", serde_json::json!(response.url())),
            ("page", serde_json::json!(page.number)),
        ])?;
        Ok(record.into())
    }

    fn parse_nothing(_spider: &Spider, _response: Response) -> ParseResult {
        Ok(ParseOutput::new())
    }

    fn spider() -> Arc<Spider> {
        Arc::new(Spider::new(Arc::new(new_spider("pages"))))
    }

    fn records(output: ParseOutput) -> Vec<serde_json::Value> {
        output
            .into_iter()
            .filter_map(|output| match output {
                Output::Record(record) => Some(serde_json::Value::from(record)),
                Output::Request(_) => None,
            })
            .collect()
    }

    #[test]
    fn bound_callback_matches_direct_call() {
        let spider = spider();
        let response = Response::new("http://example.com/2", "<html></html>");

        let callback = bind_callback_with(parse_page, spider.clone(), Page { number: 2 });
        let bound = callback.call(response.clone()).unwrap();
        let direct = parse_page(&spider, response, &Page { number: 2 }).unwrap();

        assert_eq!(records(bound), records(direct));
    }

    #[test]
    fn keeps_the_function_name() {
        let callback = bind_callback(parse_nothing, spider());
        assert_eq!(callback.name(), "parse_nothing");
        assert!(callback.path().ends_with("callback::tests::parse_nothing"));

        let callback = bind_callback_with(parse_page, spider(), Page { number: 1 });
        assert_eq!(callback.name(), "parse_page");
    }

    #[test]
    fn closures_are_named_after_their_enclosing_function() {
        let callback = bind_callback(
            |_: &Spider, _: Response| Ok(ParseOutput::new()),
            spider(),
        );
        assert_eq!(callback.name(), "closures_are_named_after_their_enclosing_function");
        assert!(callback.path().ends_with("::{{closure}}"));
    }

    #[test]
    fn errors_from_parse_function_pass_through() {
        fn broken(_spider: &Spider, _response: Response) -> ParseResult {
            Err("markup changed".into())
        }

        let callback = bind_callback(broken, spider());
        let err = callback
            .call(Response::new("http://example.com", ""))
            .unwrap_err();
        assert_eq!(err.to_string(), "markup changed");
    }

    #[test]
    fn callback_sees_spider_state_at_call_time() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback = bind_callback(
            move |spider: &Spider, response: Response| {
                sink.lock()
                    .unwrap()
                    .push(format!("{} {}", spider.name(), response.url()));
                Ok(ParseOutput::new())
            },
            spider(),
        );

        callback.call(Response::new("http://a", "")).unwrap();
        callback.call(Response::new("http://b", "")).unwrap();
        assert_eq!(*seen.lock().unwrap(), ["pages http://a", "pages http://b"]);
    }
}
