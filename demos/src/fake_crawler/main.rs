//! Registers a few spiders and runs them through a fake engine.
//!
//! ```text
//! fake-crawler -l
//! fake-crawler spider_one
//! fake-crawler users
//! ```

use serde_json::json;
use spider_boilerplate::{
    new_crawl_spider, new_spider, register_spider, run_crawler, ParseResult, RecordType, Response,
    Settings, Spider, SpiderDefinition,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("debug"))
                .expect("telemetry: Creating EnvFilter"),
        )
        .init();
    tracing::info!("starting fake_crawler");

    for spider in spiders().expect("spiders: invalid definition") {
        register_spider(spider);
    }

    let engine = fake_engine::FakeEngine::new(fake_engine::pages());
    let settings: Settings = [("LOG_ENABLED", json!(true))].into_iter().collect();
    std::process::exit(run_crawler(engine, settings).await);
}

fn spiders() -> spider_boilerplate::Result<Vec<SpiderDefinition>> {
    let spider_one = SpiderDefinition::new("spider_one")
        .with_seed_urls(["http://example.org"])
        .with_parse(parse_org);

    let mut spider_two = new_spider("spider_two");
    spider_two.scrape("http://example.net", parse_net);

    let mut users = new_crawl_spider("users")
        .with_seed_urls(["http://stackoverflow.com/users?tab=reputation&filter=week"]);
    users.follow(r"/users\?page=\d+")?;
    users.rule(r"/users/\d+/\w+", parse_user)?;

    Ok(vec![spider_one, spider_two, users])
}

fn base_item() -> spider_boilerplate::Result<RecordType> {
    RecordType::new("spider url")
}

fn parse_org(spider: &Spider, response: Response) -> ParseResult {
    let item = base_item()?.extend("title")?;
    Ok(item
        .build([
            ("title", json!("welcome to example.org")),
            ("spider", json!(spider.name())),
            ("url", json!(response.url())),
        ])?
        .into())
}

fn parse_net(spider: &Spider, response: Response) -> ParseResult {
    let item = base_item()?.extend("name")?;
    Ok(item
        .build([
            ("name", json!("foo")),
            ("spider", json!(spider.name())),
            ("url", json!(response.url())),
        ])?
        .into())
}

fn parse_user(spider: &Spider, response: Response) -> ParseResult {
    let item = base_item()?.extend("name")?;
    let name = response.body().trim();
    Ok(item
        .build([
            ("name", json!(name)),
            ("spider", json!(spider.name())),
            ("url", json!(response.url())),
        ])?
        .into())
}

pub mod fake_engine {
    use std::{
        collections::{HashMap, HashSet},
        sync::Arc,
        time::Duration,
    };

    use async_trait::async_trait;
    use futures::stream::{self, StreamExt};
    use regex::Regex;
    use spider_boilerplate::{Engine, EngineConfig, Output, Request, Response, Spider};

    pub fn pages() -> HashMap<String, String> {
        [
            ("http://example.org", "<h1>Example Domain</h1>"),
            ("http://example.net", "<h1>Example Net</h1>"),
            (
                "http://stackoverflow.com/users?tab=reputation&filter=week",
                r#"<a href="http://stackoverflow.com/users/1/ada">Ada</a>
                   <a href="http://stackoverflow.com/users?page=2">next</a>"#,
            ),
            (
                "http://stackoverflow.com/users?page=2",
                r#"<a href="http://stackoverflow.com/users/2/grace">Grace</a>"#,
            ),
            ("http://stackoverflow.com/users/1/ada", "Ada Lovelace"),
            ("http://stackoverflow.com/users/2/grace", "Grace Hopper"),
        ]
        .into_iter()
        .map(|(url, body)| (url.to_string(), body.to_string()))
        .collect()
    }

    /// Serves canned pages instead of fetching, printing every record as JSON.
    pub struct FakeEngine {
        pages: HashMap<String, String>,
        links: Regex,
        concurrency: usize,
        delay: Duration,
    }

    impl FakeEngine {
        pub fn new(pages: HashMap<String, String>) -> Self {
            Self {
                pages,
                links: Regex::new(r#"href="([^"]+)""#).expect("valid link regex"),
                concurrency: 4,
                delay: Duration::from_millis(200),
            }
        }

        async fn fetch(&self, request: Request) -> (Request, Option<Response>) {
            tokio::time::sleep(self.delay).await;
            let response = self
                .pages
                .get(request.url())
                .map(|body| Response::new(request.url(), body.as_str()));
            (request, response)
        }

        fn handle(&self, spider: &Arc<Spider>, request: &Request, response: Response) -> Vec<Request> {
            let mut next = Vec::new();
            if request.follow() {
                let links: Vec<String> = self
                    .links
                    .captures_iter(response.body())
                    .map(|cap| cap[1].to_string())
                    .collect();
                next.extend(spider.follow_links(links));
            }
            let Some(callback) = request.callback() else {
                return next;
            };
            match callback.call(response) {
                Ok(output) => {
                    for output in output {
                        match output {
                            Output::Record(record) => println!("{}", record),
                            Output::Request(request) => next.push(request),
                        }
                    }
                }
                Err(err) => {
                    tracing::error!(
                        url = request.url(),
                        callback = callback.name(),
                        "Parsing error: {:?}",
                        err
                    );
                }
            }
            next
        }
    }

    #[async_trait]
    impl Engine for FakeEngine {
        async fn execute(&self, config: EngineConfig, spider: String, args: Vec<String>) -> i32 {
            if !args.is_empty() {
                tracing::warn!(?args, "fake engine ignores its arguments");
            }
            let definition = match config.spider_source.load(&spider) {
                Ok(definition) => definition,
                Err(err) => {
                    tracing::error!("{}", err);
                    return 1;
                }
            };
            let spider = Arc::new(Spider::new(definition));
            let mut seen = HashSet::new();
            let mut queue = spider.start_requests();

            while !queue.is_empty() {
                if config.shutdown.is_cancelled() {
                    tracing::info!("fake engine: stopping early");
                    return 130;
                }
                let wave: Vec<Request> = queue
                    .drain(..)
                    .filter(|request| seen.insert(request.url().to_string()))
                    .collect();
                let fetched: Vec<(Request, Option<Response>)> = stream::iter(wave)
                    .map(|request| self.fetch(request))
                    .buffer_unordered(self.concurrency)
                    .collect()
                    .await;
                for (request, response) in fetched {
                    match response {
                        Some(response) => queue.extend(self.handle(&spider, &request, response)),
                        None => tracing::warn!(url = request.url(), "no such page"),
                    }
                }
            }
            0
        }
    }
}
