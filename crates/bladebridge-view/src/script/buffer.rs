//! Output buffering for view evaluation
//!
//! An [`OutputBuffer`] is a stack of text levels. Evaluating a view opens a new level through
//! [`OutputBuffer::start`]; the returned [`BufferScope`] either hands the captured text back
//! with [`BufferScope::finish`] or, when dropped on any other path, truncates the stack to the
//! depth it had on entry.

use std::ops::{Deref, DerefMut};

/// Stack of output levels
#[derive(Debug, Default)]
pub struct OutputBuffer {
    levels: Vec<String>,
}

impl OutputBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nesting depth
    pub fn level(&self) -> usize {
        self.levels.len()
    }

    /// Append text to the innermost level
    ///
    /// Text written while no level is open is discarded.
    pub fn write(&mut self, text: &str) {
        if let Some(current) = self.levels.last_mut() {
            current.push_str(text);
        }
    }

    /// Open a new level
    pub fn start(&mut self) -> BufferScope<'_> {
        let entry_level = self.levels.len();
        self.levels.push(String::new());
        BufferScope {
            buffer: self,
            entry_level,
            finished: false,
        }
    }

    fn truncate(&mut self, level: usize) {
        self.levels.truncate(level);
    }
}

/// Guard over one open level of an [`OutputBuffer`]
#[derive(Debug)]
pub struct BufferScope<'a> {
    buffer: &'a mut OutputBuffer,
    entry_level: usize,
    finished: bool,
}

impl BufferScope<'_> {
    /// Depth of the buffer before this scope opened
    pub fn entry_level(&self) -> usize {
        self.entry_level
    }

    /// Close the level and return what was written to it
    pub fn finish(mut self) -> String {
        self.finished = true;
        let contents = self
            .buffer
            .levels
            .get_mut(self.entry_level)
            .map(std::mem::take)
            .unwrap_or_default();
        self.buffer.truncate(self.entry_level);
        contents
    }
}

impl Deref for BufferScope<'_> {
    type Target = OutputBuffer;

    fn deref(&self) -> &OutputBuffer {
        self.buffer
    }
}

impl DerefMut for BufferScope<'_> {
    fn deref_mut(&mut self) -> &mut OutputBuffer {
        self.buffer
    }
}

impl Drop for BufferScope<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.buffer.truncate(self.entry_level);
        }
    }
}
