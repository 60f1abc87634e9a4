use std::{fmt, sync::Arc};

use regex::Regex;

use crate::callback::ParseFn;
use crate::error::{Error, Result};

/// Decides whether a discovered link belongs to a rule.
pub trait LinkMatcher: Send + Sync {
    fn matches(&self, url: &str) -> bool;
}

impl<F> LinkMatcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, url: &str) -> bool {
        self(url)
    }
}

/// Matches links whose URL contains a match of the `allow` expression.
#[derive(Debug, Clone)]
pub struct LinkPattern {
    allow: Regex,
}

impl LinkPattern {
    pub fn new(allow: &str) -> Result<Self> {
        let allow = Regex::new(allow).map_err(|source| Error::InvalidLinkPattern {
            pattern: allow.to_string(),
            source,
        })?;
        Ok(Self { allow })
    }

    pub fn as_str(&self) -> &str {
        self.allow.as_str()
    }
}

impl LinkMatcher for LinkPattern {
    fn matches(&self, url: &str) -> bool {
        self.allow.is_match(url)
    }
}

/// A link pattern as accepted by `rule` and `follow`: a regular expression or
/// a ready-made matcher.
pub enum LinkSpec {
    Pattern(String),
    Matcher(Arc<dyn LinkMatcher>),
}

impl LinkSpec {
    pub fn matcher<M: LinkMatcher + 'static>(matcher: M) -> Self {
        LinkSpec::Matcher(Arc::new(matcher))
    }

    pub(crate) fn compile(self) -> Result<(String, Arc<dyn LinkMatcher>)> {
        match self {
            LinkSpec::Pattern(pattern) => {
                let matcher = LinkPattern::new(&pattern)?;
                Ok((pattern, Arc::new(matcher)))
            }
            LinkSpec::Matcher(matcher) => Ok(("<matcher>".to_string(), matcher)),
        }
    }
}

impl From<&str> for LinkSpec {
    fn from(pattern: &str) -> Self {
        LinkSpec::Pattern(pattern.to_string())
    }
}

impl From<String> for LinkSpec {
    fn from(pattern: String) -> Self {
        LinkSpec::Pattern(pattern)
    }
}

impl From<LinkPattern> for LinkSpec {
    fn from(pattern: LinkPattern) -> Self {
        LinkSpec::matcher(pattern)
    }
}

impl From<Arc<dyn LinkMatcher>> for LinkSpec {
    fn from(matcher: Arc<dyn LinkMatcher>) -> Self {
        LinkSpec::Matcher(matcher)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleParams {
    /// Run links found on matched pages through the rules again.
    /// Defaults to `true` without a callback and `false` with one.
    pub follow: Option<bool>,
}

/// A link pattern with what to do with the pages it matches.
#[derive(Clone)]
pub struct RuleBinding {
    pattern: String,
    matcher: Arc<dyn LinkMatcher>,
    parse: Option<ParseFn>,
    follow: bool,
}

impl RuleBinding {
    pub(crate) fn new(link: LinkSpec, parse: Option<ParseFn>, params: RuleParams) -> Result<Self> {
        let (pattern, matcher) = link.compile()?;
        let follow = params.follow.unwrap_or(parse.is_none());
        Ok(Self {
            pattern,
            matcher,
            parse,
            follow,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, url: &str) -> bool {
        self.matcher.matches(url)
    }

    pub fn parse(&self) -> Option<&ParseFn> {
        self.parse.as_ref()
    }

    pub fn follow(&self) -> bool {
        self.follow
    }
}

impl fmt::Debug for RuleBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleBinding")
            .field("pattern", &self.pattern)
            .field("parse", &self.parse.as_ref().map(ParseFn::name))
            .field("follow", &self.follow)
            .finish()
    }
}
