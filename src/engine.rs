//! The boundary to the crawling engine.
//!
//! Fetching, scheduling, retries and item pipelines all live behind the
//! [`Engine`] trait. This crate only describes what to fetch ([`Request`]),
//! what comes back ([`Response`]) and what a callback produces
//! ([`ParseOutput`]), then hands an [`EngineConfig`] to the engine.

mod message;
mod settings;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::spider::SpiderDefinition;

pub use message::{Output, ParseOutput, ParseResult, Request, Response};
pub use settings::Settings;

/// Where the engine looks spiders up by name.
pub trait SpiderSource: Send + Sync {
    fn names(&self) -> Vec<String>;
    fn load(&self, name: &str) -> Result<Arc<SpiderDefinition>>;
}

/// Everything the engine gets from the launcher.
#[derive(Clone)]
pub struct EngineConfig {
    pub settings: Settings,
    pub spider_source: Arc<dyn SpiderSource>,
    /// Cancelled when the process is asked to stop; engines should wind down.
    pub shutdown: CancellationToken,
}

impl EngineConfig {
    pub fn new(settings: Settings, spider_source: Arc<dyn SpiderSource>) -> Self {
        Self {
            settings,
            spider_source,
            shutdown: CancellationToken::new(),
        }
    }
}

#[async_trait]
pub trait Engine: Send + Sync {
    /// Runs the spider called `spider` to completion and reports a process exit code.
    ///
    /// `args` are the command line arguments this crate did not interpret.
    async fn execute(&self, config: EngineConfig, spider: String, args: Vec<String>) -> i32;
}

#[async_trait]
impl<E: Engine + ?Sized> Engine for Arc<E> {
    async fn execute(&self, config: EngineConfig, spider: String, args: Vec<String>) -> i32 {
        (**self).execute(config, spider, args).await
    }
}
