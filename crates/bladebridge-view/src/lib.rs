//! Blade-style view rendering
//!
//! The pipeline behind a render:
//!
//! 1. [`FileViewFinder`] maps a view name to a source file, trying every view path against every
//!    registered extension in priority order
//! 2. the file's extension selects an engine key, and [`EngineResolver`] hands back the single
//!    cached engine for that key
//! 3. the engine produces output: [`FileEngine`] returns the file, [`PhpEngine`] evaluates it as a
//!    view script, and [`CompilerEngine`] first compiles the template through a [`Compiler`]
//!    whenever the cached script is stale
//!
//! [`Factory`] drives the steps and announces each render through an event dispatcher.
//!
//! Rendering is single-threaded: engines and the finder keep their caches in `Rc`/`RefCell`, and
//! all per-render state (output levels, the compile stack) is owned by the render call or by the
//! engine instance.

pub mod compiler;
pub mod engines;
pub mod error;
pub mod factory;
pub mod filesystem;
pub mod finder;
pub mod script;

pub use compiler::{BladeCompiler, BladeTransform, Compiler, Transform, TransformError};
pub use engines::{
    CompilerEngine, EngineFactory, EngineResolver, FileEngine, PhpEngine, RenderEnv, ViewEngine,
    ViewIncluder, BLADE_ENGINE, FILE_ENGINE, PHP_ENGINE,
};
pub use error::{Result, ViewError};
pub use factory::Factory;
pub use filesystem::{Filesystem, LocalFilesystem};
pub use finder::{FileViewFinder, DEFAULT_EXTENSIONS, HINT_PATH_DELIMITER};
pub use script::{OutputBuffer, MAX_INCLUDE_DEPTH};

/// Variables handed to a view
pub type ViewData = serde_json::Map<String, serde_json::Value>;
