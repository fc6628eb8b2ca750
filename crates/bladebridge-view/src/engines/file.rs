//! Raw file engine

use std::path::Path;
use std::rc::Rc;

use crate::{error::Result, filesystem::Filesystem};

/// Returns view files exactly as stored
pub struct FileEngine {
    files: Rc<dyn Filesystem>,
}

impl FileEngine {
    /// Create a file engine
    pub fn new(files: Rc<dyn Filesystem>) -> Self {
        Self { files }
    }

    /// Contents of the file at `path`
    pub fn get(&self, path: &Path) -> Result<String> {
        self.files.read_to_string(path)
    }
}
