//! Drives spider definitions through an in-memory engine the way a real engine would.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex},
};

use regex::Regex;
use serde_json::{json, Value};
use spider_boilerplate::{
    async_trait, new_crawl_spider, Engine, EngineConfig, Launcher, Output, ParseResult, Record,
    RecordType, Request, Response, Spider, SpiderRegistry,
};

struct MemoryEngine {
    pages: HashMap<&'static str, &'static str>,
    fetched: Mutex<Vec<String>>,
    records: Mutex<Vec<Value>>,
}

impl MemoryEngine {
    fn new(pages: &[(&'static str, &'static str)]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages.iter().copied().collect(),
            fetched: Mutex::new(Vec::new()),
            records: Mutex::new(Vec::new()),
        })
    }
}

fn extract_links(body: &str) -> Vec<String> {
    let href = Regex::new(r#"href="([^"]+)""#).unwrap();
    href.captures_iter(body).map(|cap| cap[1].to_string()).collect()
}

#[async_trait]
impl Engine for MemoryEngine {
    async fn execute(&self, config: EngineConfig, spider: String, _args: Vec<String>) -> i32 {
        let Ok(definition) = config.spider_source.load(&spider) else {
            return 1;
        };
        let spider = Arc::new(Spider::new(definition));
        let mut queue: VecDeque<Request> = spider.start_requests().into();
        let mut seen = HashSet::new();

        while let Some(request) = queue.pop_front() {
            if !seen.insert(request.url().to_string()) {
                continue;
            }
            self.fetched.lock().unwrap().push(request.url().to_string());
            let Some(body) = self.pages.get(request.url()) else {
                continue;
            };
            if request.follow() {
                queue.extend(spider.follow_links(extract_links(body)));
            }
            let Some(callback) = request.callback() else {
                continue;
            };
            match callback.call(Response::new(request.url(), *body)) {
                Ok(output) => {
                    for output in output {
                        match output {
                            Output::Record(record) => {
                                self.records.lock().unwrap().push(Value::from(record))
                            }
                            Output::Request(request) => queue.push_back(request),
                        }
                    }
                }
                Err(_) => return 1,
            }
        }
        0
    }
}

fn text(body: &str) -> String {
    let tag = Regex::new(r"<[^>]+>").unwrap();
    tag.replace_all(body, "").trim().to_string()
}

fn parse_user(spider: &Spider, response: Response) -> ParseResult {
    let item = RecordType::new("name url spider")?;
    Ok(item
        .build([
            ("name", json!(text(response.body()))),
            ("url", json!(response.url())),
            ("spider", json!(spider.name())),
        ])?
        .into())
}

fn parse_question(spider: &Spider, response: Response) -> ParseResult {
    let item = RecordType::new("title user url")?;
    let question = item.build([("title", json!(text(response.body()))), ("url", json!(response.url()))])?;
    let user_link = format!("{}/author", response.url());
    let callback = Arc::new(spider.clone()).callback_with(parse_author, question);
    Ok(Request::new(user_link).with_callback(callback).into())
}

fn parse_author(_spider: &Spider, response: Response, question: &Record) -> ParseResult {
    let mut question = question.clone();
    question.set("user", json!({ "name": text(response.body()), "url": response.url() }))?;
    Ok(question.into())
}

fn parse_broken(_spider: &Spider, _response: Response) -> ParseResult {
    Err("layout changed".into())
}

#[tokio::test]
async fn crawl_spider_follows_pages_and_parses_matches() {
    let engine = MemoryEngine::new(&[
        (
            "http://so.com/users",
            r#"<a href="http://so.com/users?page=2">next</a> <a href="http://so.com/users/1/ada">ada</a> <a href="http://so.com/help">help</a>"#,
        ),
        (
            "http://so.com/users?page=2",
            r#"<a href="http://so.com/users/2/bob">bob</a> <a href="http://so.com/users/1/ada">ada</a>"#,
        ),
        ("http://so.com/users/1/ada", "<h1>Ada</h1>"),
        ("http://so.com/users/2/bob", "<h1>Bob</h1>"),
        ("http://so.com/help", "<h1>Help</h1>"),
    ]);

    let mut users = new_crawl_spider("users").with_seed_urls(["http://so.com/users"]);
    users.follow(r"/users\?page=\d+").unwrap();
    users.rule(r"/users/\d+/\w+", parse_user).unwrap();

    let registry = Arc::new(SpiderRegistry::new());
    registry.register(users);
    let code = Launcher::new(engine.clone())
        .with_registry(registry)
        .run(["crawler", "users"])
        .await;

    assert_eq!(code, 0);
    assert!(!engine.fetched.lock().unwrap().contains(&"http://so.com/help".to_string()));
    let names: Vec<Value> = engine
        .records
        .lock()
        .unwrap()
        .iter()
        .map(|record| record["name"].clone())
        .collect();
    assert_eq!(names, [json!("Ada"), json!("Bob")]);
    assert_eq!(engine.records.lock().unwrap()[0]["spider"], json!("users"));
}

#[tokio::test]
async fn record_is_completed_by_a_follow_up_callback() {
    let engine = MemoryEngine::new(&[
        ("http://so.com/?tab=hot", r#"<a href="http://so.com/questions/7/borrowing">q</a>"#),
        ("http://so.com/questions/7/borrowing", "<h1>Borrowing</h1>"),
        ("http://so.com/questions/7/borrowing/author", "<span>Ferris</span>"),
    ]);

    let mut top = new_crawl_spider("top").with_seed_urls(["http://so.com/?tab=hot"]);
    top.rule(r"/questions/\d+/[\w\-]+$", parse_question).unwrap();

    let registry = Arc::new(SpiderRegistry::new());
    registry.register(top);
    let code = Launcher::new(engine.clone())
        .with_registry(registry)
        .run(["crawler", "top"])
        .await;

    assert_eq!(code, 0);
    assert_eq!(
        *engine.records.lock().unwrap(),
        [json!({
            "title": "Borrowing",
            "user": {"name": "Ferris", "url": "http://so.com/questions/7/borrowing/author"},
            "url": "http://so.com/questions/7/borrowing",
        })]
    );
}

#[tokio::test]
async fn parse_errors_reach_the_engine() {
    let engine = MemoryEngine::new(&[
        ("http://so.com/", r#"<a href="http://so.com/item.php">item</a>"#),
        ("http://so.com/item.php", "<p>item</p>"),
    ]);

    let mut broken = new_crawl_spider("broken").with_seed_urls(["http://so.com/"]);
    broken.rule(r"item\.php", parse_broken).unwrap();

    let registry = Arc::new(SpiderRegistry::new());
    registry.register(broken);
    let code = Launcher::new(engine.clone())
        .with_registry(registry)
        .run(["crawler", "broken"])
        .await;

    assert_eq!(code, 1);
    assert!(engine.records.lock().unwrap().is_empty());
}
