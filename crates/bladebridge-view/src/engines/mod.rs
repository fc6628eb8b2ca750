//! Rendering engines
//!
//! Each engine turns one category of view source into output:
//!
//! - [`FileEngine`] returns the file untouched
//! - [`PhpEngine`] evaluates the file as a view script
//! - [`CompilerEngine`] compiles a template into a view script when stale, then evaluates it
//!
//! Both script engines share [`evaluate_path`] for buffered evaluation and error wrapping.

pub mod compiler;
pub mod file;
pub mod php;
pub mod resolver;

pub use compiler::CompilerEngine;
pub use file::FileEngine;
pub use php::PhpEngine;
pub use resolver::{EngineFactory, EngineResolver};

use std::path::Path;

use bladebridge_config::ViewMetadata;
use tracing::debug;

use crate::{
    error::{Result, ViewError},
    filesystem::Filesystem,
    script::{parser, Interpreter, OutputBuffer},
    ViewData,
};

/// Key of the raw file engine
pub const FILE_ENGINE: &str = "file";
/// Key of the plain script engine
pub const PHP_ENGINE: &str = "php";
/// Key of the compiled template engine
pub const BLADE_ENGINE: &str = "blade";

/// Renders nested views on behalf of a script
pub trait ViewIncluder {
    /// Render the view `name` with `data`, opening levels on `buffer`
    fn include(&self, name: &str, data: &ViewData, buffer: &mut OutputBuffer) -> Result<String>;
}

/// Per-render state handed to an engine
pub struct RenderEnv<'a> {
    /// Output sink for the current render
    pub buffer: &'a mut OutputBuffer,
    /// Where `<?include ?>` resolves views, if anywhere
    pub views: Option<&'a dyn ViewIncluder>,
}

impl<'a> RenderEnv<'a> {
    /// Environment without include support
    pub fn new(buffer: &'a mut OutputBuffer) -> Self {
        Self {
            buffer,
            views: None,
        }
    }

    /// Resolve includes through `views`
    pub fn with_views(mut self, views: &'a dyn ViewIncluder) -> Self {
        self.views = Some(views);
        self
    }
}

/// The engine variants
pub enum ViewEngine {
    /// Raw file contents
    File(FileEngine),
    /// Plain view scripts
    Php(PhpEngine),
    /// Compiled templates
    Compiler(CompilerEngine),
}

impl ViewEngine {
    /// Render the view at `path` with `data`
    pub fn get(&self, path: &Path, data: &ViewData, env: &mut RenderEnv<'_>) -> Result<String> {
        match self {
            ViewEngine::File(engine) => engine.get(path),
            ViewEngine::Php(engine) => engine.get(path, data, env),
            ViewEngine::Compiler(engine) => engine.get(path, data, env),
        }
    }

    /// Short name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            ViewEngine::File(_) => "file",
            ViewEngine::Php(_) => "php",
            ViewEngine::Compiler(_) => "compiler",
        }
    }

    /// The compiled template engine, if this is one
    pub fn as_compiler(&self) -> Option<&CompilerEngine> {
        match self {
            ViewEngine::Compiler(engine) => Some(engine),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ViewEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ViewEngine").field(&self.kind()).finish()
    }
}

/// Evaluate the script at `path` into a fresh output level
///
/// The level is released on every exit path, so a failed evaluation leaves `env.buffer` at the
/// depth it had on entry.
pub(crate) fn evaluate_path(
    files: &dyn Filesystem,
    path: &Path,
    data: &ViewData,
    metadata: Option<&ViewMetadata>,
    env: &mut RenderEnv<'_>,
) -> Result<String> {
    let views = env.views;
    let mut scope = env.buffer.start();
    debug!(path = %path.display(), level = scope.level(), "Evaluating view script");

    let result = files.read_to_string(path).and_then(|source| {
        let nodes = parser::parse(&source).map_err(|e| ViewError::Script {
            message: e.message,
            file: path.to_path_buf(),
            line: e.line,
        })?;

        Interpreter::new(path, data)
            .with_metadata(metadata)
            .with_views(views)
            .run(&nodes, &mut scope)
    });

    match result {
        Ok(()) => Ok(scope.finish()),
        Err(e) => {
            drop(scope);
            Err(handle_view_exception(e, path))
        }
    }
}

/// Wrap an evaluation failure, keeping the original as its source
fn handle_view_exception(error: ViewError, path: &Path) -> ViewError {
    match error {
        render @ ViewError::Render { .. } => render,
        ViewError::Script {
            ref message,
            ref file,
            line,
        } => ViewError::Render {
            message: message.clone(),
            view: None,
            file: file.clone(),
            line: Some(line),
            source: Box::new(error),
        },
        other => ViewError::Render {
            message: other.to_string(),
            view: None,
            file: path.to_path_buf(),
            line: None,
            source: Box::new(other),
        },
    }
}
