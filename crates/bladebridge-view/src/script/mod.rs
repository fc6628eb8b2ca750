//! View-script dialect
//!
//! Both the plain-script engine and compiled templates produce this dialect: text with
//! `<?= ?>`, `<?! ?>`, `<?# ?>` and statement tags, evaluated against JSON view data.

pub mod buffer;
pub mod interpreter;
pub mod parser;

pub use buffer::{BufferScope, OutputBuffer};
pub use interpreter::{Interpreter, MAX_INCLUDE_DEPTH};
