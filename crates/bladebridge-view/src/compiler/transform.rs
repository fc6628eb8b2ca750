//! Template-to-script transformations
//!
//! [`BladeTransform`] covers a small Blade-flavoured grammar:
//!
//! | Template | View script |
//! |----------|-------------|
//! | `{{-- note --}}` | *(dropped)* |
//! | `{{ expr }}` | `<?= expr ?>` |
//! | `{!! expr !!}` | `<?! expr ?>` |
//! | `@{{ text }}` | `{{ text }}` |
//! | `@@word` | `@word` |
//! | `@include('view')` | `<?include 'view' ?>` |
//! | `@if(expr)` / `@elseif(expr)` / `@else` / `@endif` | `<?if expr ?>` ... |
//! | `@foreach(items as item)` / `@endforeach` | `<?foreach items as item ?>` ... |
//!
//! A literal `<?` in the template is emitted as an echoed string so it can never open a tag.

use thiserror::Error;

/// A template the transformation cannot handle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransformError {
    /// What is wrong
    pub message: String,
    /// Line in the template, when known
    pub line: Option<usize>,
}

impl TransformError {
    /// Error at a template line
    pub fn at_line(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
        }
    }
}

/// Turns template source text into view-script text
pub trait Transform {
    /// Transform one template
    fn transform(&self, source: &str) -> Result<String, TransformError>;
}

/// The default Blade-flavoured grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct BladeTransform;

impl Transform for BladeTransform {
    fn transform(&self, source: &str) -> Result<String, TransformError> {
        Translator::new(source).run()
    }
}

struct Translator<'a> {
    source: &'a str,
    position: usize,
    line: usize,
    output: String,
}

impl<'a> Translator<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            position: 0,
            line: 1,
            output: String::with_capacity(source.len()),
        }
    }

    fn run(mut self) -> Result<String, TransformError> {
        while self.position < self.source.len() {
            let rest = self.rest();

            if rest.starts_with("{{--") {
                self.comment()?;
            } else if rest.starts_with("@{{") {
                self.take(3);
                self.output.push_str("{{");
            } else if rest.starts_with("{!!") {
                self.echo("{!!", "!!}", "<?!")?;
            } else if rest.starts_with("{{") {
                self.echo("{{", "}}", "<?=")?;
            } else if rest.starts_with("<?") {
                self.take(2);
                self.output.push_str("<?! '<?' ?>");
            } else if rest.starts_with("@@") {
                self.take(2);
                self.output.push('@');
            } else if rest.starts_with('@') && self.at_word_boundary() {
                self.directive()?;
            } else {
                let len = rest.chars().next().map(char::len_utf8).unwrap_or(1);
                let text = self.take(len);
                self.output.push_str(text);
            }
        }

        Ok(self.output)
    }

    fn comment(&mut self) -> Result<(), TransformError> {
        let line = self.line;
        let end = self.rest()[4..]
            .find("--}}")
            .ok_or_else(|| TransformError::at_line("Unterminated comment, expected '--}}'", line))?;
        self.take(4 + end + 4);
        Ok(())
    }

    fn echo(&mut self, open: &str, close: &str, tag: &str) -> Result<(), TransformError> {
        let line = self.line;
        let end = self.rest()[open.len()..].find(close).ok_or_else(|| {
            TransformError::at_line(format!("Unterminated echo, expected '{}'", close), line)
        })?;

        self.take(open.len());
        let expr = self.take(end).trim();
        self.take(close.len());

        if expr.is_empty() {
            return Err(TransformError::at_line("Empty echo", line));
        }

        self.output.push_str(tag);
        self.output.push(' ');
        self.output.push_str(expr);
        self.output.push_str(" ?>");
        Ok(())
    }

    fn directive(&mut self) -> Result<(), TransformError> {
        let line = self.line;
        let name_len = self.rest()[1..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(self.rest().len() - 1);
        let name = &self.rest()[1..1 + name_len];

        let statement = match name {
            "include" | "if" | "elseif" | "foreach" => {
                self.take(1 + name_len);
                let args = self.arguments(name, line)?;
                format!("<?{} {} ?>", name, args)
            }
            "else" | "endif" | "endforeach" => {
                self.take(1 + name_len);
                format!("<?{} ?>", name)
            }
            _ => {
                let text = self.take(1 + name_len);
                self.output.push_str(text);
                return Ok(());
            }
        };

        self.output.push_str(&statement);
        Ok(())
    }

    /// Read `( ... )` after a directive name, honouring nesting and quotes
    fn arguments(&mut self, directive: &str, line: usize) -> Result<String, TransformError> {
        let gap = self.rest().len() - self.rest().trim_start_matches(|c: char| c == ' ' || c == '\t').len();
        if !self.rest()[gap..].starts_with('(') {
            return Err(TransformError::at_line(
                format!("Directive @{} expects arguments", directive),
                line,
            ));
        }
        self.take(gap);

        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut close = None;

        for (offset, ch) in self.rest().char_indices() {
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
                continue;
            }
            match ch {
                '\'' | '"' => quote = Some(ch),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(offset);
                        break;
                    }
                }
                _ => {}
            }
        }

        let close = close.ok_or_else(|| {
            TransformError::at_line(
                format!("Unbalanced parentheses in @{}", directive),
                line,
            )
        })?;

        let inner = self.take(close + 1);
        let args = inner[1..inner.len() - 1].trim();
        if args.is_empty() {
            return Err(TransformError::at_line(
                format!("Directive @{} expects arguments", directive),
                line,
            ));
        }
        Ok(args.to_string())
    }

    fn at_word_boundary(&self) -> bool {
        self.source[..self.position]
            .chars()
            .next_back()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == '.'))
    }

    /// Consume `len` bytes, keeping the line count current
    fn take(&mut self, len: usize) -> &'a str {
        let end = (self.position + len).min(self.source.len());
        let taken = &self.source[self.position..end];
        self.line += taken.matches('\n').count();
        self.position = end;
        taken
    }

    fn rest(&self) -> &'a str {
        &self.source[self.position..]
    }
}
