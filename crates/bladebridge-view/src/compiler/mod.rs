//! Template compilation
//!
//! A [`Compiler`] turns template sources into view scripts cached on disk and knows when a
//! cached script has gone stale. The template grammar itself is a pluggable [`Transform`].

pub mod blade;
pub mod transform;

pub use blade::BladeCompiler;
pub use transform::{BladeTransform, Transform, TransformError};

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Compiles template sources into cached view scripts
pub trait Compiler {
    /// Whether the compiled script for `path` is missing or older than the source
    fn is_expired(&self, path: &Path) -> Result<bool>;

    /// Compile the source at `path` and write the script to [`Compiler::compiled_path`]
    fn compile(&self, path: &Path) -> Result<()>;

    /// Where the compiled script for `path` lives; never touches the filesystem
    fn compiled_path(&self, path: &Path) -> PathBuf;
}
