//! Plain view-script engine

use std::path::Path;
use std::rc::Rc;

use crate::{
    engines::{evaluate_path, RenderEnv},
    error::Result,
    filesystem::Filesystem,
    ViewData,
};

/// Evaluates view scripts as written
pub struct PhpEngine {
    files: Rc<dyn Filesystem>,
}

impl PhpEngine {
    /// Create a script engine
    pub fn new(files: Rc<dyn Filesystem>) -> Self {
        Self { files }
    }

    /// Evaluate the script at `path` with `data` in scope
    pub fn get(&self, path: &Path, data: &ViewData, env: &mut RenderEnv<'_>) -> Result<String> {
        evaluate_path(self.files.as_ref(), path, data, None, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ViewError, filesystem::LocalFilesystem, script::OutputBuffer};
    use serde_json::json;
    use tempfile::TempDir;

    fn data(value: serde_json::Value) -> ViewData {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_evaluates_script() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hello.php");
        std::fs::write(&path, "Hello, <?= name ?>!").unwrap();

        let engine = PhpEngine::new(Rc::new(LocalFilesystem::new()));
        let mut buffer = OutputBuffer::new();
        let out = engine
            .get(&path, &data(json!({"name": "Ada"})), &mut RenderEnv::new(&mut buffer))
            .unwrap();

        assert_eq!(out, "Hello, Ada!");
        assert_eq!(buffer.level(), 0);
    }

    #[test]
    fn test_failure_restores_buffer_and_wraps_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.php");
        std::fs::write(&path, "partial output\n<?= missing ?>").unwrap();

        let engine = PhpEngine::new(Rc::new(LocalFilesystem::new()));
        let mut buffer = OutputBuffer::new();
        let mut outer = buffer.start();
        outer.write("before ");

        let result = engine.get(&path, &ViewData::new(), &mut RenderEnv::new(&mut outer));
        assert_eq!(outer.level(), 1);
        assert_eq!(outer.finish(), "before ");

        match result {
            Err(ViewError::Render {
                message,
                file,
                line,
                view,
                ..
            }) => {
                assert_eq!(message, "Undefined variable: $missing");
                assert_eq!(file, path);
                assert_eq!(line, Some(2));
                assert!(view.is_none());
            }
            other => panic!("expected Render error, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_is_wrapped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.php");
        std::fs::write(&path, "<?if open ?>never closed").unwrap();

        let engine = PhpEngine::new(Rc::new(LocalFilesystem::new()));
        let mut buffer = OutputBuffer::new();
        let err = engine
            .get(&path, &ViewData::new(), &mut RenderEnv::new(&mut buffer))
            .unwrap_err();

        assert!(matches!(err.root_cause(), ViewError::Script { .. }));
        assert_eq!(buffer.level(), 0);
    }
}
