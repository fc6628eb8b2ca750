//! Blade-style templates behind a single facade
//!
//! [`Blade`] wires a local filesystem, an event dispatcher, a view finder, a template compiler
//! with its on-disk cache, and the `file`, `php` and `blade` engines into one view factory.
//!
//! ```no_run
//! use bladebridge::Blade;
//! use serde_json::json;
//!
//! let blade = Blade::new(["/srv/app/views"], "/srv/app/cache/views", None);
//! let html = blade.render("welcome", json!({ "name": "Ada" }))?;
//! # Ok::<(), bladebridge::BladeError>(())
//! ```

pub mod error;
pub mod logging;

pub use bladebridge_config::{BladeConfig, ConfigLoader, LoggingConfig, ViewMetadata};
pub use bladebridge_events::{Dispatcher, Event, EventDispatcher};
pub use bladebridge_view::{Factory, ViewData, ViewError};
pub use error::{BladeError, Result};

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use bladebridge_view::{
    BladeCompiler, CompilerEngine, EngineResolver, FileEngine, FileViewFinder, Filesystem,
    LocalFilesystem, PhpEngine, Transform, ViewEngine, BLADE_ENGINE, FILE_ENGINE, PHP_ENGINE,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

/// Shared-data key the bridge metadata is published under
pub const METADATA_KEY: &str = "app";

/// The bridge: renders views by name
pub struct Blade {
    files: Rc<dyn Filesystem>,
    compiler: Rc<BladeCompiler>,
    metadata: ViewMetadata,
    events: Arc<Dispatcher>,
    factory: Factory,
}

impl Blade {
    /// Create a bridge over `view_paths`, caching compiled views in `cache_path`
    pub fn new<I, P>(view_paths: I, cache_path: impl Into<PathBuf>, metadata: Option<ViewMetadata>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let view_paths: Vec<PathBuf> = view_paths.into_iter().map(Into::into).collect();
        let cache_path = cache_path.into();
        let metadata = metadata.unwrap_or_default();

        let files: Rc<dyn Filesystem> = Rc::new(LocalFilesystem::new());
        let events = Arc::new(Dispatcher::new());
        let compiler = Rc::new(BladeCompiler::new(Rc::clone(&files), cache_path.clone()));
        let finder = FileViewFinder::new(Rc::clone(&files), view_paths.clone());

        let dispatcher: Arc<dyn EventDispatcher> = events.clone();
        let factory = Factory::new(EngineResolver::new(), finder, dispatcher);

        let mut blade = Self {
            files,
            compiler,
            metadata,
            events,
            factory,
        };
        blade.register_file_engine();
        blade.register_php_engine();
        blade.register_blade_engine();

        if !blade.metadata.is_empty() {
            let shared = blade.metadata.to_value();
            blade.factory.share(METADATA_KEY, shared);
        }

        info!(
            view_paths = ?view_paths,
            cache_path = %cache_path.display(),
            "Blade bridge ready"
        );
        blade
    }

    /// Create a bridge from a validated configuration
    pub fn from_config(config: &BladeConfig) -> Result<Self> {
        config.validate()?;

        let mut blade = Self::new(
            config.view_paths.iter().cloned(),
            config.cache_path.clone(),
            Some(config.metadata.clone()),
        );
        for mapping in &config.extensions {
            debug!(extension = %mapping.extension, engine = %mapping.engine, "Adding configured extension");
            blade
                .factory
                .add_extension(&mapping.extension, mapping.engine.clone());
        }
        Ok(blade)
    }

    /// Load configuration from file and environment, then build the bridge
    pub fn from_loader(loader: &ConfigLoader) -> Result<Self> {
        let config = loader.load()?;
        Self::from_config(&config)
    }

    /// Compile templates with a different transformation
    pub fn with_transform(mut self, transform: impl Transform + 'static) -> Self {
        let compiler = BladeCompiler::new(Rc::clone(&self.files), self.compiler.cache_path())
            .with_transform(transform);
        self.compiler = Rc::new(compiler);
        self.register_blade_engine();
        self
    }

    /// Render the view `name`; `data` must serialize to a JSON object (or `null`)
    pub fn render(&self, name: &str, data: impl Serialize) -> Result<String> {
        let data = to_view_data(data)?;
        Ok(self.factory.make(name, &data)?)
    }

    /// The view factory
    pub fn view(&self) -> &Factory {
        &self.factory
    }

    /// The view factory, mutably
    pub fn view_mut(&mut self) -> &mut Factory {
        &mut self.factory
    }

    /// The event dispatcher
    pub fn events(&self) -> &Arc<Dispatcher> {
        &self.events
    }

    /// The template compiler shared by every `blade` engine
    pub fn compiler(&self) -> &Rc<BladeCompiler> {
        &self.compiler
    }

    /// Metadata handed to compiled templates
    pub fn metadata(&self) -> &ViewMetadata {
        &self.metadata
    }

    fn register_file_engine(&mut self) {
        let files = Rc::clone(&self.files);
        self.factory.register_engine(FILE_ENGINE, move || {
            ViewEngine::File(FileEngine::new(Rc::clone(&files)))
        });
    }

    fn register_php_engine(&mut self) {
        let files = Rc::clone(&self.files);
        self.factory.register_engine(PHP_ENGINE, move || {
            ViewEngine::Php(PhpEngine::new(Rc::clone(&files)))
        });
    }

    fn register_blade_engine(&mut self) {
        let files = Rc::clone(&self.files);
        let compiler = Rc::clone(&self.compiler);
        let metadata = self.metadata.clone();
        self.factory.register_engine(BLADE_ENGINE, move || {
            ViewEngine::Compiler(CompilerEngine::new(
                compiler.clone(),
                Rc::clone(&files),
                Some(metadata.clone()),
            ))
        });
    }
}

impl std::fmt::Debug for Blade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blade")
            .field("cache_path", &self.compiler.cache_path())
            .field("metadata", &self.metadata)
            .field("factory", &self.factory)
            .finish()
    }
}

fn to_view_data(data: impl Serialize) -> Result<ViewData> {
    match serde_json::to_value(data)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(ViewData::new()),
        other => Err(ViewError::InvalidData(format!(
            "expected an object, got {}",
            describe(&other)
        ))
        .into()),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
