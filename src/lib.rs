//! Helpers to declare spiders and records and run them through a crawling engine.
//!
//! The crawling itself (fetching, scheduling, pipelines) is done by an
//! [`Engine`] implementation. This crate describes what to crawl:
//!
//! - [`RecordType`]s built from field names, optionally extending a parent type.
//! - [`SpiderDefinition`]s holding seed URLs, URL bindings and link rules.
//! - [`bind_callback`] to use free functions as parse callbacks.
//! - A [`SpiderRegistry`] and the [`run_crawler`] launcher.

pub mod callback;
pub mod engine;
pub mod error;
pub mod item;
pub mod launcher;
pub mod registry;
pub mod spider;

pub use callback::{bind_callback, bind_callback_with, Callback, ParseFn};
pub use engine::{
    Engine, EngineConfig, Output, ParseOutput, ParseResult, Request, Response, Settings,
    SpiderSource,
};
pub use error::{BoxError, Error, Result};
pub use item::{make_record_type, FieldNames, Record, RecordType};
pub use launcher::{run_crawler, run_spider, Launcher};
pub use registry::{register_spider, SpiderRegistry};
pub use spider::{
    make_spider_type, new_crawl_spider, new_spider, spider_from_function, LinkMatcher,
    LinkPattern, LinkSpec, Overrides, RuleBinding, RuleParams, Spider, SpiderDefinition,
    SpiderKind, UrlBinding,
};

pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
