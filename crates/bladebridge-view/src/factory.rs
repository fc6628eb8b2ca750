//! View factory
//!
//! Orchestrates a render: find the source, pick the engine from its extension, resolve the engine
//! and evaluate, announcing progress through the event dispatcher along the way.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bladebridge_events::{Event, EventDispatcher, Listener};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    engines::{EngineResolver, RenderEnv, ViewEngine, ViewIncluder},
    error::{Result, ViewError},
    finder::FileViewFinder,
    script::OutputBuffer,
    ViewData,
};

/// Renders views by name
pub struct Factory {
    resolver: EngineResolver,
    finder: FileViewFinder,
    events: Arc<dyn EventDispatcher>,
    shared: ViewData,
}

impl Factory {
    /// Create a factory
    pub fn new(
        resolver: EngineResolver,
        finder: FileViewFinder,
        events: Arc<dyn EventDispatcher>,
    ) -> Self {
        Self {
            resolver,
            finder,
            events,
            shared: ViewData::new(),
        }
    }

    /// Render the view `name` with `data`
    pub fn make(&self, name: &str, data: &ViewData) -> Result<String> {
        let mut buffer = OutputBuffer::new();
        self.render_into(name, data, &mut buffer)
    }

    /// Render the view `name` inside an existing output buffer
    pub fn render_into(
        &self,
        name: &str,
        data: &ViewData,
        buffer: &mut OutputBuffer,
    ) -> Result<String> {
        let path = self.finder.find(name)?;
        self.render_path(name, &path, data, buffer)
    }

    /// Render the file at `path` without going through the finder
    pub fn file(&self, path: impl AsRef<Path>, data: &ViewData) -> Result<String> {
        let path = path.as_ref();
        let name = path.to_string_lossy();
        let mut buffer = OutputBuffer::new();
        self.render_path(&name, path, data, &mut buffer)
    }

    /// Render the first of `names` that exists
    pub fn first(&self, names: &[&str], data: &ViewData) -> Result<String> {
        let mut searched: Vec<PathBuf> = Vec::new();

        for name in names {
            match self.finder.find(name) {
                Ok(path) => {
                    let mut buffer = OutputBuffer::new();
                    return self.render_path(name, &path, data, &mut buffer);
                }
                Err(ViewError::NotFound { searched: tried, .. }) => searched.extend(tried),
                Err(e) => return Err(e),
            }
        }

        Err(ViewError::NotFound {
            name: names.join(", "),
            searched,
        })
    }

    /// Whether `name` resolves to a source file
    pub fn exists(&self, name: &str) -> bool {
        self.finder.find(name).is_ok()
    }

    /// Make `value` available to every view under `key`
    pub fn share(&mut self, key: impl Into<String>, value: Value) {
        self.shared.insert(key.into(), value);
    }

    /// Data shared with every view
    pub fn shared(&self) -> &ViewData {
        &self.shared
    }

    /// Run `listener` whenever `view` is created; `*` suffixes match by prefix
    pub fn creator(&self, view: &str, listener: Listener) -> bladebridge_events::Result<()> {
        self.events.listen(&format!("creating: {}", view), listener)
    }

    /// Run `listener` just before `view` is rendered; `*` suffixes match by prefix
    pub fn composer(&self, view: &str, listener: Listener) -> bladebridge_events::Result<()> {
        self.events.listen(&format!("composing: {}", view), listener)
    }

    /// Append a view path
    pub fn add_location(&mut self, path: impl Into<PathBuf>) {
        self.finder.add_location(path);
    }

    /// Insert a view path ahead of all others
    pub fn prepend_location(&mut self, path: impl Into<PathBuf>) {
        self.finder.prepend_location(path);
    }

    /// Route files ending in `extension` to the engine registered as `engine`
    pub fn add_extension(&mut self, extension: &str, engine: impl Into<String>) {
        self.finder.add_extension(extension, engine);
    }

    /// Register hint paths for `namespace::view` names
    pub fn add_namespace<I, P>(&mut self, namespace: &str, hints: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.finder.add_namespace(namespace, hints);
    }

    /// Register an engine factory under `key`
    pub fn register_engine<F>(&mut self, key: impl Into<String>, factory: F)
    where
        F: Fn() -> ViewEngine + 'static,
    {
        self.resolver.register(key, factory);
    }

    /// Engine key for a view source
    pub fn engine_from_path(&self, path: &Path) -> Result<&str> {
        self.finder
            .engine_for(path)
            .ok_or_else(|| ViewError::UnrecognizedExtension(path.to_path_buf()))
    }

    /// The engine resolver
    pub fn resolver(&self) -> &EngineResolver {
        &self.resolver
    }

    /// The view finder
    pub fn finder(&self) -> &FileViewFinder {
        &self.finder
    }

    /// The view finder, mutably
    pub fn finder_mut(&mut self) -> &mut FileViewFinder {
        &mut self.finder
    }

    /// The event dispatcher
    pub fn events(&self) -> &Arc<dyn EventDispatcher> {
        &self.events
    }

    fn render_path(
        &self,
        name: &str,
        path: &Path,
        data: &ViewData,
        buffer: &mut OutputBuffer,
    ) -> Result<String> {
        let key = self.engine_from_path(path)?;
        let engine = self.resolver.resolve(key)?;
        debug!(view = %name, path = %path.display(), engine = %key, "Rendering view");

        let mut merged = self.shared.clone();
        merged.extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));

        self.fire("creating", name, path);
        self.fire("composing", name, path);

        let output = engine.get(path, &merged, &mut RenderEnv::new(buffer).with_views(self))?;

        self.fire("rendered", name, path);
        Ok(output)
    }

    fn fire(&self, stage: &str, name: &str, path: &Path) {
        let event = Event::new(
            format!("{}: {}", stage, name),
            json!({ "view": name, "path": path.to_string_lossy() }),
        );

        if let Err(e) = self.events.dispatch(event) {
            warn!(view = %name, stage = %stage, error = %e, "View event failed");
        }
    }
}

impl ViewIncluder for Factory {
    fn include(&self, name: &str, data: &ViewData, buffer: &mut OutputBuffer) -> Result<String> {
        self.render_into(name, data, buffer)
    }
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("resolver", &self.resolver)
            .field("finder", &self.finder)
            .field("shared", &self.shared)
            .finish()
    }
}
