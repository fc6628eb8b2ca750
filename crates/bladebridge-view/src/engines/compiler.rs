//! Compiled template engine

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use bladebridge_config::ViewMetadata;
use tracing::debug;

use crate::{
    compiler::Compiler,
    engines::{evaluate_path, RenderEnv},
    error::{Result, ViewError},
    filesystem::Filesystem,
    ViewData,
};

/// Compiles templates on demand and evaluates the compiled scripts
pub struct CompilerEngine {
    compiler: Rc<dyn Compiler>,
    files: Rc<dyn Filesystem>,
    metadata: ViewMetadata,
    last_compiled: RefCell<Vec<PathBuf>>,
}

impl CompilerEngine {
    /// Create an engine; `metadata` is merged over the defaults and exposed to scripts as `this`
    pub fn new(
        compiler: Rc<dyn Compiler>,
        files: Rc<dyn Filesystem>,
        metadata: Option<ViewMetadata>,
    ) -> Self {
        let mut merged = ViewMetadata::default();
        if let Some(metadata) = metadata {
            merged.merge(metadata);
        }

        Self {
            compiler,
            files,
            metadata: merged,
            last_compiled: RefCell::new(Vec::new()),
        }
    }

    /// Metadata visible to compiled scripts
    pub fn metadata(&self) -> &ViewMetadata {
        &self.metadata
    }

    /// The compiler backing this engine
    pub fn compiler(&self) -> &Rc<dyn Compiler> {
        &self.compiler
    }

    /// Views currently being evaluated, outermost first
    pub fn compile_stack(&self) -> Vec<PathBuf> {
        self.last_compiled.borrow().clone()
    }

    /// Compile `path` if stale, then evaluate the compiled script
    pub fn get(&self, path: &Path, data: &ViewData, env: &mut RenderEnv<'_>) -> Result<String> {
        let frame = CompileFrame::push(&self.last_compiled, path);

        if self.compiler.is_expired(path)? {
            debug!(path = %path.display(), "Compiled view is stale");
            self.compiler.compile(path)?;
        }

        let compiled = self.compiler.compiled_path(path);
        evaluate_path(
            self.files.as_ref(),
            &compiled,
            data,
            Some(&self.metadata),
            env,
        )
        .map_err(|e| self.annotate(e, &frame))
    }

    /// Name the innermost view in a render error that no nested view has claimed yet
    fn annotate(&self, error: ViewError, frame: &CompileFrame<'_>) -> ViewError {
        match error {
            ViewError::Render {
                message,
                view: None,
                file,
                line,
                source,
            } => {
                let view = self.files.canonicalize(&frame.innermost());
                ViewError::Render {
                    message: format!("{} (View: {})", message, view.display()),
                    view: Some(view),
                    file,
                    line,
                    source,
                }
            }
            other => other,
        }
    }
}

/// Entry on the compile stack, popped when dropped
struct CompileFrame<'a> {
    stack: &'a RefCell<Vec<PathBuf>>,
}

impl<'a> CompileFrame<'a> {
    fn push(stack: &'a RefCell<Vec<PathBuf>>, path: &Path) -> Self {
        stack.borrow_mut().push(path.to_path_buf());
        Self { stack }
    }

    fn innermost(&self) -> PathBuf {
        self.stack.borrow().last().cloned().unwrap_or_default()
    }
}

impl Drop for CompileFrame<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}
