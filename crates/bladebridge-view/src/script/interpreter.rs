//! View-script evaluation

use std::path::Path;

use bladebridge_config::ViewMetadata;
use serde_json::{json, Map, Value};

use crate::{
    engines::ViewIncluder,
    error::{Result, ViewError},
    script::{
        buffer::OutputBuffer,
        parser::{Expr, Node},
    },
    ViewData,
};

/// Deepest include nesting allowed before evaluation gives up
pub const MAX_INCLUDE_DEPTH: usize = 64;

/// Evaluates parsed scripts against view data
pub struct Interpreter<'a> {
    file: &'a Path,
    data: &'a ViewData,
    metadata: Option<&'a ViewMetadata>,
    views: Option<&'a dyn ViewIncluder>,
    locals: Vec<Map<String, Value>>,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter for the script at `file`
    pub fn new(file: &'a Path, data: &'a ViewData) -> Self {
        Self {
            file,
            data,
            metadata: None,
            views: None,
            locals: Vec::new(),
        }
    }

    /// Make engine metadata readable through `this.<field>`
    pub fn with_metadata(mut self, metadata: Option<&'a ViewMetadata>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Allow `<?include ?>` through the given includer
    pub fn with_views(mut self, views: Option<&'a dyn ViewIncluder>) -> Self {
        self.views = views;
        self
    }

    /// Evaluate `nodes`, writing output to the innermost level of `out`
    pub fn run(&mut self, nodes: &[Node], out: &mut OutputBuffer) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.write(text),
                Node::Echo { expr, escape, line } => {
                    let value = self.eval(expr, *line)?;
                    let text = stringify(&value);
                    if *escape {
                        out.write(&html_escape(&text));
                    } else {
                        out.write(&text);
                    }
                }
                Node::Include { view, line } => {
                    let rendered = self.include(view, *line, out)?;
                    out.write(&rendered);
                }
                Node::If {
                    branches,
                    otherwise,
                    line,
                } => {
                    let mut taken = None;
                    for branch in branches {
                        if truthy(&self.eval(&branch.condition, *line)?) {
                            taken = Some(&branch.body);
                            break;
                        }
                    }
                    if let Some(body) = taken.or(otherwise.as_ref()) {
                        self.run(body, out)?;
                    }
                }
                Node::Foreach {
                    items,
                    binding,
                    body,
                    line,
                } => {
                    let items = match self.eval(items, *line)? {
                        Value::Array(values) => values,
                        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
                        other => {
                            return Err(self.error(
                                format!(
                                    "foreach() argument must be an array or object, {} given",
                                    type_name(&other)
                                ),
                                *line,
                            ))
                        }
                    };

                    let count = items.len();
                    for (index, item) in items.into_iter().enumerate() {
                        let mut frame = Map::new();
                        frame.insert(binding.clone(), item);
                        frame.insert(
                            "loop".to_string(),
                            json!({
                                "index": index,
                                "iteration": index + 1,
                                "first": index == 0,
                                "last": index + 1 == count,
                                "count": count,
                            }),
                        );

                        self.locals.push(frame);
                        let result = self.run(body, out);
                        self.locals.pop();
                        result?;
                    }
                }
            }
        }
        Ok(())
    }

    fn include(&self, view: &str, line: usize, out: &mut OutputBuffer) -> Result<String> {
        let views = self.views.ok_or_else(|| {
            self.error(format!("Cannot include [{}] outside a view factory", view), line)
        })?;

        if out.level() > MAX_INCLUDE_DEPTH {
            return Err(self.error(
                format!(
                    "Maximum include depth of {} exceeded while including [{}]",
                    MAX_INCLUDE_DEPTH, view
                ),
                line,
            ));
        }

        views.include(view, &self.scope(), out)
    }

    /// All variables visible at this point, innermost winning
    fn scope(&self) -> ViewData {
        let mut data = self.data.clone();
        for frame in &self.locals {
            for (key, value) in frame {
                data.insert(key.clone(), value.clone());
            }
        }
        data
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.locals
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.data.get(name))
    }

    fn eval(&self, expr: &Expr, line: usize) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Not(inner) => Ok(Value::Bool(!truthy(&self.eval(inner, line)?))),
            Expr::This(field) => {
                let metadata = self.metadata.ok_or_else(|| {
                    self.error(format!("Metadata is not available for this.{}", field), line)
                })?;
                metadata
                    .field(field)
                    .ok_or_else(|| self.error(format!("Undefined metadata field: {}", field), line))
            }
            Expr::Path(segments) => {
                let (first, rest) = segments
                    .split_first()
                    .ok_or_else(|| self.error("Empty expression", line))?;

                let mut current = self
                    .lookup(first)
                    .ok_or_else(|| self.error(format!("Undefined variable: ${}", first), line))?;

                for (depth, segment) in rest.iter().enumerate() {
                    let next = match current {
                        Value::Object(map) => map.get(segment),
                        Value::Array(values) => segment
                            .parse::<usize>()
                            .ok()
                            .and_then(|index| values.get(index)),
                        _ => None,
                    };
                    current = next.ok_or_else(|| {
                        self.error(
                            format!("Undefined key: {}", segments[..depth + 2].join(".")),
                            line,
                        )
                    })?;
                }

                Ok(current.clone())
            }
        }
    }

    fn error(&self, message: impl Into<String>, line: usize) -> ViewError {
        ViewError::Script {
            message: message.into(),
            file: self.file.to_path_buf(),
            line,
        }
    }
}

/// Loose truthiness: null, false, 0, "", "0" and empty collections are false
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(values) => !values.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text form of a value as echoed into a view
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// HTML escape a string
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}
