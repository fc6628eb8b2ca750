//! Error types for view resolution, compilation and rendering

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while locating, compiling or rendering a view
#[derive(Debug, Error)]
pub enum ViewError {
    /// Filesystem failure
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// No source file matched across all view paths and extensions
    #[error("View [{name}] not found. Searched: {}", display_paths(.searched))]
    NotFound {
        /// Requested view name
        name: String,
        /// Every path tried, in trial order
        searched: Vec<PathBuf>,
    },

    /// No factory was registered for an engine key
    #[error("Engine [{0}] not found.")]
    EngineNotFound(String),

    /// The template transformation rejected a source file
    #[error("Failed to compile {}: {message}", .path.display())]
    Compile {
        /// Source template path
        path: PathBuf,
        /// What went wrong
        message: String,
        /// Line in the source, when known
        line: Option<usize>,
    },

    /// Evaluating a view script failed
    #[error("{message} in {}:{line}", .file.display())]
    Script {
        /// What went wrong
        message: String,
        /// Script being evaluated
        file: PathBuf,
        /// Line in the script
        line: usize,
    },

    /// A render failure, wrapping its original cause
    #[error("{message}")]
    Render {
        /// Message, suffixed with ` (View: <path>)` once attributed
        message: String,
        /// View the failure is attributed to
        view: Option<PathBuf>,
        /// File that was executing
        file: PathBuf,
        /// Line that was executing, when known
        line: Option<usize>,
        /// Original cause
        #[source]
        source: Box<ViewError>,
    },

    /// A path has no registered extension
    #[error("Unrecognized extension in file: {}", .0.display())]
    UnrecognizedExtension(PathBuf),

    /// A view name could not be parsed
    #[error("View [{0}] has an invalid name.")]
    InvalidName(String),

    /// A namespaced view referenced an unregistered namespace
    #[error("No hint path defined for [{0}].")]
    UnknownNamespace(String),

    /// View data is not a JSON object
    #[error("Invalid view data: {0}")]
    InvalidData(String),
}

impl ViewError {
    /// Build an `Io` error for a path
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ViewError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// View this error has been attributed to, if any
    pub fn view(&self) -> Option<&Path> {
        match self {
            ViewError::Render { view, .. } => view.as_deref(),
            _ => None,
        }
    }

    /// The innermost error in the wrapping chain
    pub fn root_cause(&self) -> &ViewError {
        match self {
            ViewError::Render { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "(no paths)".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for view operations
pub type Result<T> = std::result::Result<T, ViewError>;
