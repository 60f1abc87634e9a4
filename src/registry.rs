//! Name to spider definition table consulted by the launcher.
//!
//! Registration happens while the program sets itself up, before any crawl
//! starts. Registering a second definition under a taken name replaces the
//! first one but keeps its place in the listing.

use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::engine::SpiderSource;
use crate::error::{Error, Result};
use crate::spider::SpiderDefinition;

type Spiders = IndexMap<String, Arc<SpiderDefinition>>;

static GLOBAL: OnceLock<Arc<SpiderRegistry>> = OnceLock::new();

#[derive(Debug, Default)]
pub struct SpiderRegistry {
    spiders: RwLock<Spiders>,
}

impl SpiderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry, created on first use.
    pub fn global() -> Arc<SpiderRegistry> {
        GLOBAL.get_or_init(|| Arc::new(SpiderRegistry::new())).clone()
    }

    pub fn register<D: Into<Arc<SpiderDefinition>>>(&self, definition: D) -> Arc<SpiderDefinition> {
        let definition = definition.into();
        let name = definition.name().to_string();
        if self
            .write()
            .insert(name.clone(), definition.clone())
            .is_some()
        {
            tracing::warn!(spider = %name, "spider registered twice, keeping the latest definition");
        } else {
            tracing::debug!(spider = %name, "registered spider");
        }
        definition
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<SpiderDefinition>> {
        self.read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::SpiderNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Registered names in first-registration order.
    pub fn list_names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Forgets every registered spider.
    pub fn reset(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, Spiders> {
        self.spiders.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Spiders> {
        self.spiders.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SpiderSource for SpiderRegistry {
    fn names(&self) -> Vec<String> {
        self.list_names()
    }

    fn load(&self, name: &str) -> Result<Arc<SpiderDefinition>> {
        self.lookup(name)
    }
}

/// Registers `definition` in the process-wide registry.
pub fn register_spider<D: Into<Arc<SpiderDefinition>>>(definition: D) -> Arc<SpiderDefinition> {
    SpiderRegistry::global().register(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spider::{new_spider, SpiderDefinition};

    #[test]
    fn lists_names_in_registration_order() {
        let registry = SpiderRegistry::new();
        registry.register(new_spider("spider_one"));
        registry.register(new_spider("spider_two"));
        registry.register(new_spider("featured"));
        assert_eq!(registry.list_names(), ["spider_one", "spider_two", "featured"]);
    }

    #[test]
    fn re_registering_keeps_position_and_replaces_definition() {
        let registry = SpiderRegistry::new();
        registry.register(new_spider("A").with_seed_urls(["http://old"]));
        registry.register(new_spider("B"));
        registry.register(new_spider("A").with_seed_urls(["http://new"]));

        assert_eq!(registry.list_names(), ["A", "B"]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("A").unwrap().seed_urls(), ["http://new"]);
    }

    #[test]
    fn missing_name_is_not_found() {
        let registry = SpiderRegistry::new();
        registry.register(new_spider("A"));
        match registry.lookup("B") {
            Err(Error::SpiderNotFound(name)) => assert_eq!(name, "B"),
            other => panic!("expected not found, got {:?}", other),
        }
        assert!(!registry.contains("B"));
    }

    #[test]
    fn reset_empties_the_registry() {
        let registry = SpiderRegistry::new();
        registry.register(SpiderDefinition::crawl("users"));
        assert!(!registry.is_empty());
        registry.reset();
        assert!(registry.is_empty());
        assert!(registry.list_names().is_empty());
    }

    #[test]
    fn serves_as_spider_source() {
        let registry = SpiderRegistry::new();
        registry.register(new_spider("top"));
        let source: &dyn SpiderSource = &registry;
        assert_eq!(source.names(), ["top"]);
        assert_eq!(source.load("top").unwrap().name(), "top");
        assert!(source.load("nope").is_err());
    }

    #[test]
    fn global_registry_is_shared() {
        let name = "registry::tests::global";
        register_spider(new_spider(name));
        assert!(SpiderRegistry::global().contains(name));
    }
}
