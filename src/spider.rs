//! Spider definitions and spider instances.
//!
//! A [`SpiderDefinition`] is plain data: a name, seed URLs, and an ordered list
//! of URL bindings (and, for crawl spiders, rule bindings). Definitions are
//! built either directly, in the declarative style,
//!
//! ```rust,ignore
//! let mut spider = SpiderDefinition::new("spider_one")
//!     .with_seed_urls(["http://example.org"])
//!     .with_parse(parse_home);
//! spider.scrape("http://example.org/company_info", parse_info);
//! ```
//!
//! or derived from a base with [`make_spider_type`]. A derived definition owns
//! copies of its base's collections, so bindings registered on one spider never
//! show up on a sibling derived from the same base.
//!
//! At crawl time the engine wraps a definition in a [`Spider`] and asks it for
//! its start requests.

mod rule;

use std::{collections::HashSet, sync::Arc};

use serde_json::{Map, Value};

use crate::callback::{Callback, ParseFn};
use crate::engine::{ParseResult, Request, Response};
use crate::error::{Error, Result};

pub use rule::{LinkMatcher, LinkPattern, LinkSpec, RuleBinding, RuleParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiderKind {
    /// Fetches its seed URLs and bound URLs, nothing else.
    Basic,
    /// Also follows links discovered on fetched pages according to its rules.
    Crawl,
}

/// A literal URL and the function parsing its page.
#[derive(Debug, Clone)]
pub struct UrlBinding {
    url: String,
    parse: ParseFn,
}

impl UrlBinding {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn parse(&self) -> &ParseFn {
        &self.parse
    }
}

#[derive(Debug, Clone)]
pub struct SpiderDefinition {
    name: String,
    kind: SpiderKind,
    seed_urls: Vec<String>,
    bindings: Vec<UrlBinding>,
    rules: Vec<RuleBinding>,
    attrs: Map<String, Value>,
    parse: Option<ParseFn>,
}

impl SpiderDefinition {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self::with_kind(name, SpiderKind::Basic)
    }

    /// A definition that follows links through rules.
    pub fn crawl<N: Into<String>>(name: N) -> Self {
        Self::with_kind(name, SpiderKind::Crawl)
    }

    fn with_kind<N: Into<String>>(name: N, kind: SpiderKind) -> Self {
        Self {
            name: name.into(),
            kind,
            seed_urls: Vec::new(),
            bindings: Vec::new(),
            rules: Vec::new(),
            attrs: Map::new(),
            parse: None,
        }
    }

    /// Base for plain spiders.
    pub fn default_base() -> Self {
        Self::new("BaseSpider")
    }

    /// Base for link-following spiders.
    pub fn crawl_base() -> Self {
        Self::crawl("CrawlSpider")
    }

    pub fn with_seed_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_seed_url<U: Into<String>>(&mut self, url: U) {
        self.seed_urls.push(url.into());
    }

    pub fn with_attr<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Sets the function parsing responses of the seed URLs.
    pub fn with_parse<F>(mut self, parse: F) -> Self
    where
        F: Fn(&Spider, Response) -> ParseResult + Send + Sync + 'static,
    {
        self.parse = Some(ParseFn::new(parse));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SpiderKind {
        self.kind
    }

    pub fn seed_urls(&self) -> &[String] {
        &self.seed_urls
    }

    pub fn bindings(&self) -> &[UrlBinding] {
        &self.bindings
    }

    /// Rules in registration order; the first matching rule claims a link.
    pub fn rules(&self) -> &[RuleBinding] {
        &self.rules
    }

    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn parse(&self) -> Option<&ParseFn> {
        self.parse.as_ref()
    }

    /// Registers `parse` for `url` and returns `parse` unchanged.
    pub fn scrape<U, F>(&mut self, url: U, parse: F) -> F
    where
        U: Into<String>,
        F: Fn(&Spider, Response) -> ParseResult + Clone + Send + Sync + 'static,
    {
        self.push_binding(url.into(), ParseFn::new(parse.clone()));
        parse
    }

    /// Like [`scrape`](Self::scrape), with fixed arguments passed to every call.
    pub fn scrape_with<U, F, A>(&mut self, url: U, parse: F, args: A) -> F
    where
        U: Into<String>,
        F: Fn(&Spider, Response, &A) -> ParseResult + Clone + Send + Sync + 'static,
        A: Send + Sync + 'static,
    {
        self.push_binding(url.into(), ParseFn::with_args(parse.clone(), args));
        parse
    }

    fn push_binding(&mut self, url: String, parse: ParseFn) {
        tracing::debug!(spider = %self.name, url = %url, parse = parse.name(), "binding url");
        self.bindings.push(UrlBinding { url, parse });
    }

    /// Registers `parse` for pages whose links match `link` and returns `parse` unchanged.
    pub fn rule<L, F>(&mut self, link: L, parse: F) -> Result<F>
    where
        L: Into<LinkSpec>,
        F: Fn(&Spider, Response) -> ParseResult + Clone + Send + Sync + 'static,
    {
        self.push_rule(
            link.into(),
            Some(ParseFn::new(parse.clone())),
            RuleParams::default(),
        )?;
        Ok(parse)
    }

    pub fn rule_with<L, F, A>(&mut self, link: L, parse: F, args: A, params: RuleParams) -> Result<F>
    where
        L: Into<LinkSpec>,
        F: Fn(&Spider, Response, &A) -> ParseResult + Clone + Send + Sync + 'static,
        A: Send + Sync + 'static,
    {
        self.push_rule(
            link.into(),
            Some(ParseFn::with_args(parse.clone(), args)),
            params,
        )?;
        Ok(parse)
    }

    /// Registers a rule that only traverses matching links, parsing nothing.
    pub fn follow<L: Into<LinkSpec>>(&mut self, link: L) -> Result<()> {
        self.push_rule(link.into(), None, RuleParams { follow: Some(true) })
    }

    fn push_rule(&mut self, link: LinkSpec, parse: Option<ParseFn>, params: RuleParams) -> Result<()> {
        if self.kind != SpiderKind::Crawl {
            return Err(Error::RulesNotSupported(self.name.clone()));
        }
        let rule = RuleBinding::new(link, parse, params)?;
        tracing::debug!(spider = %self.name, rule = ?rule, "binding rule");
        self.rules.push(rule);
        Ok(())
    }
}

/// Replacements applied to a definition derived with [`make_spider_type`].
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub seed_urls: Option<Vec<String>>,
    pub attrs: Map<String, Value>,
    pub parse: Option<ParseFn>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed_urls = Some(urls.into_iter().map(Into::into).collect());
        self
    }

    pub fn attr<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn parse<F>(mut self, parse: F) -> Self
    where
        F: Fn(&Spider, Response) -> ParseResult + Send + Sync + 'static,
    {
        self.parse = Some(ParseFn::new(parse));
        self
    }
}

/// Derives a new definition named `name` from `base`.
///
/// Seed URLs, bindings, rules and attributes are copied out of `base`; the new
/// definition shares no collection with it or with other definitions derived from it.
pub fn make_spider_type<N: Into<String>>(
    name: N,
    base: &SpiderDefinition,
    overrides: Overrides,
) -> SpiderDefinition {
    let mut definition = base.clone();
    definition.name = name.into();
    if let Some(seed_urls) = overrides.seed_urls {
        definition.seed_urls = seed_urls;
    }
    definition.attrs.extend(overrides.attrs);
    if overrides.parse.is_some() {
        definition.parse = overrides.parse;
    }
    definition
}

pub fn new_spider<N: Into<String>>(name: N) -> SpiderDefinition {
    make_spider_type(name, &SpiderDefinition::default_base(), Overrides::default())
}

pub fn new_crawl_spider<N: Into<String>>(name: N) -> SpiderDefinition {
    make_spider_type(name, &SpiderDefinition::crawl_base(), Overrides::default())
}

/// A definition consisting of `parse` alone, fetching just `url`.
///
/// `parse` receives only the response. The name defaults to the function's own name;
/// a closure has none and falls back to the function it was written in, so closures
/// should be given an explicit `name`.
pub fn spider_from_function<U, F>(
    url: U,
    parse: F,
    name: Option<&str>,
    base: &SpiderDefinition,
) -> SpiderDefinition
where
    U: Into<String>,
    F: Fn(Response) -> ParseResult + Send + Sync + 'static,
{
    let parse = ParseFn::response_only(parse);
    let name = name.unwrap_or(parse.name()).to_string();
    let mut definition = make_spider_type(name, base, Overrides::new().seed_urls([url]));
    definition.parse = Some(parse);
    definition
}

/// A running spider: a definition plus the arguments it was started with.
#[derive(Debug, Clone)]
pub struct Spider {
    definition: Arc<SpiderDefinition>,
    args: Map<String, Value>,
}

impl Spider {
    pub fn new(definition: Arc<SpiderDefinition>) -> Self {
        Self {
            definition,
            args: Map::new(),
        }
    }

    pub fn with_args(mut self, args: Map<String, Value>) -> Self {
        self.args = args;
        self
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn definition(&self) -> &SpiderDefinition {
        &self.definition
    }

    /// A start argument, falling back to the definition's attribute of the same name.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.args.get(key).or_else(|| self.definition.attr(key))
    }

    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }

    /// One request per URL binding in registration order, then one per seed URL.
    pub fn start_requests(self: &Arc<Self>) -> Vec<Request> {
        let follow = self.definition.kind == SpiderKind::Crawl;
        let bound = self.definition.bindings.iter().map(|binding| {
            Request::new(binding.url.clone()).with_callback(binding.parse.bind(self.clone()))
        });
        let seeds = self.definition.seed_urls.iter().map(|url| {
            let request = Request::new(url.clone()).following(follow);
            match &self.definition.parse {
                Some(parse) => request.with_callback(parse.bind(self.clone())),
                None => request,
            }
        });
        bound.chain(seeds).collect()
    }

    /// Requests for the `links` found on a followed page.
    ///
    /// Rules are tried in registration order; a link is claimed by the first rule
    /// matching it and requested at most once. Links matching no rule are dropped.
    pub fn follow_links<I, S>(self: &Arc<Self>, links: I) -> Vec<Request>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let links: Vec<String> = links.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        let mut requests = Vec::new();
        for rule in &self.definition.rules {
            for link in links.iter().filter(|link| rule.matches(link)) {
                if !seen.insert(link.as_str()) {
                    continue;
                }
                let request = Request::new(link.clone()).following(rule.follow());
                requests.push(match rule.parse() {
                    Some(parse) => request.with_callback(parse.bind(self.clone())),
                    None => request,
                });
            }
        }
        requests
    }

    /// Binds `parse` to this spider, e.g. for a follow-up request built inside a callback.
    pub fn callback<F>(self: &Arc<Self>, parse: F) -> Callback
    where
        F: Fn(&Spider, Response) -> ParseResult + Send + Sync + 'static,
    {
        ParseFn::new(parse).bind(self.clone())
    }

    pub fn callback_with<F, A>(self: &Arc<Self>, parse: F, args: A) -> Callback
    where
        F: Fn(&Spider, Response, &A) -> ParseResult + Send + Sync + 'static,
        A: Send + Sync + 'static,
    {
        ParseFn::with_args(parse, args).bind(self.clone())
    }
}
