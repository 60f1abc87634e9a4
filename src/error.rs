//! Error types for record and spider definitions.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("duplicate field '{field}' in record type '{record}'")]
    DuplicateField { field: String, record: String },

    #[error("unknown field '{field}' for record type '{record}'")]
    UnknownField { field: String, record: String },

    #[error("spider not found: {0}")]
    SpiderNotFound(String),

    #[error("invalid link pattern '{pattern}': {source}")]
    InvalidLinkPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("spider '{0}' does not follow links, rules need a crawl spider")]
    RulesNotSupported(String),
}

/// Error type returned by parse functions and passed through to the engine untouched.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;
