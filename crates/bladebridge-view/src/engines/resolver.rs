//! Engine resolver
//!
//! Engines are registered as zero-argument factories and built on first use. Each key maps to at
//! most one live instance until the key is registered again.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::{
    engines::ViewEngine,
    error::{Result, ViewError},
};

/// Builds an engine on demand
pub type EngineFactory = Box<dyn Fn() -> ViewEngine>;

/// Registry of engine factories with a lazily filled instance cache
#[derive(Default)]
pub struct EngineResolver {
    resolvers: HashMap<String, EngineFactory>,
    resolved: RefCell<HashMap<String, Rc<ViewEngine>>>,
}

impl EngineResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `key`, replacing any earlier factory and its cached engine
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F)
    where
        F: Fn() -> ViewEngine + 'static,
    {
        let key = key.into();
        self.resolved.borrow_mut().remove(&key);
        debug!(engine = %key, "Registered engine");
        self.resolvers.insert(key, Box::new(factory));
    }

    /// The engine for `key`, built on first request
    pub fn resolve(&self, key: &str) -> Result<Rc<ViewEngine>> {
        if let Some(engine) = self.resolved.borrow().get(key) {
            return Ok(Rc::clone(engine));
        }

        let factory = self
            .resolvers
            .get(key)
            .ok_or_else(|| ViewError::EngineNotFound(key.to_string()))?;

        let engine = Rc::new(factory());
        debug!(engine = %key, kind = engine.kind(), "Resolved engine");
        self.resolved
            .borrow_mut()
            .insert(key.to_string(), Rc::clone(&engine));
        Ok(engine)
    }

    /// Whether a factory exists for `key`
    pub fn is_registered(&self, key: &str) -> bool {
        self.resolvers.contains_key(key)
    }

    /// Registered engine keys, sorted
    pub fn engines(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.resolvers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl std::fmt::Debug for EngineResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineResolver")
            .field("engines", &self.engines())
            .field("resolved", &self.resolved.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engines::{FileEngine, PhpEngine},
        filesystem::{Filesystem, LocalFilesystem},
    };
    use std::cell::Cell;

    fn files() -> Rc<dyn Filesystem> {
        Rc::new(LocalFilesystem::new())
    }

    #[test]
    fn test_resolve_is_lazy_and_cached() {
        let built = Rc::new(Cell::new(0));
        let counter = built.clone();

        let mut resolver = EngineResolver::new();
        resolver.register("file", move || {
            counter.set(counter.get() + 1);
            ViewEngine::File(FileEngine::new(files()))
        });
        assert_eq!(built.get(), 0);

        let first = resolver.resolve("file").unwrap();
        let second = resolver.resolve("file").unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(built.get(), 1);
    }

    #[test]
    fn test_reregister_invalidates_cache() {
        let mut resolver = EngineResolver::new();
        resolver.register("view", || ViewEngine::File(FileEngine::new(files())));
        let first = resolver.resolve("view").unwrap();
        assert_eq!(first.kind(), "file");

        resolver.register("view", || ViewEngine::Php(PhpEngine::new(files())));
        let second = resolver.resolve("view").unwrap();

        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(second.kind(), "php");
    }

    #[test]
    fn test_unknown_engine() {
        let resolver = EngineResolver::new();
        let err = resolver.resolve("twig").unwrap_err();
        assert!(matches!(err, ViewError::EngineNotFound(ref k) if k == "twig"));
        assert_eq!(err.to_string(), "Engine [twig] not found.");
    }

    #[test]
    fn test_engines_listing() {
        let mut resolver = EngineResolver::new();
        resolver.register("php", || ViewEngine::Php(PhpEngine::new(files())));
        resolver.register("file", || ViewEngine::File(FileEngine::new(files())));

        assert_eq!(resolver.engines(), vec!["file", "php"]);
        assert!(resolver.is_registered("php"));
        assert!(!resolver.is_registered("blade"));
    }
}
