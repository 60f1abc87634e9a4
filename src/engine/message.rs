use std::fmt;

use crate::callback::Callback;
use crate::error::BoxError;
use crate::item::Record;

/// A fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    url: String,
    body: String,
}

impl Response {
    pub fn new<U: Into<String>, B: Into<String>>(url: U, body: B) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// A fetch the engine should schedule.
#[derive(Clone)]
pub struct Request {
    url: String,
    callback: Option<Callback>,
    follow: bool,
}

impl Request {
    pub fn new<U: Into<String>>(url: U) -> Self {
        Self {
            url: url.into(),
            callback: None,
            follow: false,
        }
    }

    pub fn with_callback(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Marks whether links found on the response go through the spider's rules.
    pub fn following(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `None` leaves the response to the engine's default handling.
    pub fn callback(&self) -> Option<&Callback> {
        self.callback.as_ref()
    }

    pub fn follow(&self) -> bool {
        self.follow
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("url", &self.url)
            .field("callback", &self.callback.as_ref().map(Callback::name))
            .field("follow", &self.follow)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Output {
    Record(Record),
    Request(Request),
}

/// What a callback hands back to the engine, in production order.
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    outputs: Vec<Output>,
}

pub type ParseResult = Result<ParseOutput, BoxError>;

impl ParseOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_record(&mut self, record: Record) {
        self.outputs.push(Output::Record(record));
    }

    pub fn add_request(&mut self, request: Request) {
        self.outputs.push(Output::Request(request));
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Output> {
        self.outputs.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.outputs.iter().filter_map(|output| match output {
            Output::Record(record) => Some(record),
            Output::Request(_) => None,
        })
    }

    pub fn requests(&self) -> impl Iterator<Item = &Request> {
        self.outputs.iter().filter_map(|output| match output {
            Output::Request(request) => Some(request),
            Output::Record(_) => None,
        })
    }
}

impl IntoIterator for ParseOutput {
    type Item = Output;
    type IntoIter = std::vec::IntoIter<Output>;

    fn into_iter(self) -> Self::IntoIter {
        self.outputs.into_iter()
    }
}

impl Extend<Output> for ParseOutput {
    fn extend<T: IntoIterator<Item = Output>>(&mut self, iter: T) {
        self.outputs.extend(iter);
    }
}

impl From<()> for ParseOutput {
    fn from(_: ()) -> Self {
        Self::new()
    }
}

impl From<Record> for ParseOutput {
    fn from(record: Record) -> Self {
        Self {
            outputs: vec![Output::Record(record)],
        }
    }
}

impl From<Request> for ParseOutput {
    fn from(request: Request) -> Self {
        Self {
            outputs: vec![Output::Request(request)],
        }
    }
}

impl From<Vec<Record>> for ParseOutput {
    fn from(records: Vec<Record>) -> Self {
        Self {
            outputs: records.into_iter().map(Output::Record).collect(),
        }
    }
}
