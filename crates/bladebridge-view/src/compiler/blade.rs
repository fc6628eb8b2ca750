//! Blade template compiler

use std::path::{Path, PathBuf};
use std::rc::Rc;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::{
    compiler::{BladeTransform, Compiler, Transform},
    error::{Result, ViewError},
    filesystem::Filesystem,
};

/// Extension of compiled artifacts
const COMPILED_EXTENSION: &str = "php";

/// Compiles templates into view scripts under a cache directory
pub struct BladeCompiler {
    files: Rc<dyn Filesystem>,
    cache_path: PathBuf,
    transform: Box<dyn Transform>,
}

impl BladeCompiler {
    /// Create a compiler writing artifacts to `cache_path`
    pub fn new(files: Rc<dyn Filesystem>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            files,
            cache_path: cache_path.into(),
            transform: Box::new(BladeTransform),
        }
    }

    /// Use a different template transformation
    pub fn with_transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transform = Box::new(transform);
        self
    }

    /// Directory compiled artifacts are written to
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Transform template text without touching the filesystem
    pub fn compile_string(&self, source: &str) -> Result<String> {
        self.transform
            .transform(source)
            .map_err(|e| ViewError::Compile {
                path: PathBuf::new(),
                message: e.message,
                line: e.line,
            })
    }
}

impl Compiler for BladeCompiler {
    fn is_expired(&self, path: &Path) -> Result<bool> {
        let source_modified = self.files.last_modified(path)?;

        let compiled = self.compiled_path(path);
        if !self.files.exists(&compiled) {
            return Ok(true);
        }

        let compiled_modified = match self.files.last_modified(&compiled) {
            Ok(modified) => modified,
            Err(e) => {
                debug!(path = %compiled.display(), error = %e, "Compiled view unreadable, treating as expired");
                return Ok(true);
            }
        };

        Ok(compiled_modified < source_modified)
    }

    fn compile(&self, path: &Path) -> Result<()> {
        let source = self.files.read_to_string(path)?;

        let mut contents = self
            .transform
            .transform(&source)
            .map_err(|e| ViewError::Compile {
                path: path.to_path_buf(),
                message: e.message,
                line: e.line,
            })?;

        contents.push_str(&footer(path));

        let compiled = self.compiled_path(path);
        self.files.write(&compiled, contents.as_bytes())?;

        info!(
            source = %path.display(),
            compiled = %compiled.display(),
            "Compiled view"
        );
        Ok(())
    }

    fn compiled_path(&self, path: &Path) -> PathBuf {
        let digest = Sha256::digest(path.to_string_lossy().as_bytes());
        self.cache_path
            .join(format!("{:x}.{}", digest, COMPILED_EXTENSION))
    }
}

/// Comment tag recording which source an artifact came from
fn footer(path: &Path) -> String {
    let source = path.to_string_lossy().replace("?>", "? >");
    format!("<?# PATH {} ENDPATH ?>", source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::TransformError;
    use crate::filesystem::LocalFilesystem;
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn setup() -> (TempDir, BladeCompiler) {
        let dir = TempDir::new().unwrap();
        let compiler = BladeCompiler::new(Rc::new(LocalFilesystem::new()), dir.path().join("cache"));
        (dir, compiler)
    }

    fn set_modified(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn test_compiled_path_is_pure_and_distinct() {
        let (dir, compiler) = setup();
        let a = compiler.compiled_path(Path::new("/views/a.blade.php"));
        let b = compiler.compiled_path(Path::new("/views/b.blade.php"));

        assert_eq!(a, compiler.compiled_path(Path::new("/views/a.blade.php")));
        assert_ne!(a, b);
        assert!(a.starts_with(dir.path().join("cache")));
        assert_eq!(a.extension().unwrap(), "php");
        assert_eq!(a.file_stem().unwrap().len(), 64);
        assert!(!dir.path().join("cache").exists());
    }

    #[test]
    fn test_missing_artifact_is_expired() {
        let (dir, compiler) = setup();
        let source = dir.path().join("hello.blade.php");
        fs::write(&source, "Hello").unwrap();

        assert!(compiler.is_expired(&source).unwrap());
    }

    #[test]
    fn test_compile_writes_artifact_with_footer() {
        let (dir, compiler) = setup();
        let source = dir.path().join("hello.blade.php");
        fs::write(&source, "Hello {{ name }}").unwrap();

        compiler.compile(&source).unwrap();

        let compiled = fs::read_to_string(compiler.compiled_path(&source)).unwrap();
        assert!(compiled.starts_with("Hello <?= name ?>"));
        assert!(compiled.ends_with(&format!("<?# PATH {} ENDPATH ?>", source.display())));
        assert!(!compiler.is_expired(&source).unwrap());
    }

    #[test]
    fn test_touched_source_expires_artifact() {
        let (dir, compiler) = setup();
        let source = dir.path().join("hello.blade.php");
        fs::write(&source, "Hello").unwrap();
        compiler.compile(&source).unwrap();

        let compiled = compiler.compiled_path(&source);
        let earlier = SystemTime::now() - Duration::from_secs(60);
        set_modified(&compiled, earlier);
        set_modified(&source, earlier + Duration::from_secs(10));

        assert!(compiler.is_expired(&source).unwrap());

        compiler.compile(&source).unwrap();
        assert!(!compiler.is_expired(&source).unwrap());
    }

    #[test]
    fn test_equal_times_are_fresh() {
        let (dir, compiler) = setup();
        let source = dir.path().join("hello.blade.php");
        fs::write(&source, "Hello").unwrap();
        compiler.compile(&source).unwrap();

        let moment = SystemTime::now() - Duration::from_secs(30);
        set_modified(&source, moment);
        set_modified(&compiler.compiled_path(&source), moment);

        assert!(!compiler.is_expired(&source).unwrap());
    }

    #[test]
    fn test_recompiling_is_byte_identical() {
        let (dir, compiler) = setup();
        let source = dir.path().join("list.blade.php");
        fs::write(&source, "@foreach(items as item){{ item }}@endforeach").unwrap();

        compiler.compile(&source).unwrap();
        let first = fs::read(compiler.compiled_path(&source)).unwrap();
        compiler.compile(&source).unwrap();
        let second = fs::read(compiler.compiled_path(&source)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_template_is_compile_error() {
        let (dir, compiler) = setup();
        let source = dir.path().join("broken.blade.php");
        fs::write(&source, "line one\n{{ oops").unwrap();

        match compiler.compile(&source).unwrap_err() {
            ViewError::Compile { path, line, .. } => {
                assert_eq!(path, source);
                assert_eq!(line, Some(2));
            }
            other => panic!("expected Compile, got {:?}", other),
        }
        assert!(!compiler.compiled_path(&source).exists());
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let (dir, compiler) = setup();
        let source = dir.path().join("missing.blade.php");

        assert!(matches!(compiler.compile(&source), Err(ViewError::Io { .. })));
        assert!(matches!(compiler.is_expired(&source), Err(ViewError::Io { .. })));
    }

    #[test]
    fn test_custom_transform() {
        struct Upper;
        impl Transform for Upper {
            fn transform(&self, source: &str) -> std::result::Result<String, TransformError> {
                Ok(source.to_uppercase())
            }
        }

        let (_dir, compiler) = setup();
        let compiler = compiler.with_transform(Upper);
        assert_eq!(compiler.compile_string("shout").unwrap(), "SHOUT");
    }

    #[test]
    fn test_footer_cannot_close_comment_early() {
        assert_eq!(
            footer(Path::new("/views/odd?>name.blade.php")),
            "<?# PATH /views/odd? >name.blade.php ENDPATH ?>"
        );
    }
}
