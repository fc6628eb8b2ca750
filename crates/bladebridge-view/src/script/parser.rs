//! View-script parser
//!
//! Turns the target dialect into a tree of [`Node`]s. Text outside `<? ... ?>` tags is kept
//! verbatim; tags are `<?= expr ?>`, `<?! expr ?>`, `<?# comment ?>`, `<?include 'view' ?>`,
//! `<?if expr ?>` / `<?elseif expr ?>` / `<?else ?>` / `<?endif ?>` and
//! `<?foreach expr as name ?>` / `<?endforeach ?>`.

use serde_json::Value;

/// A parsed script element
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Verbatim text
    Text(String),
    /// Echo an expression
    Echo {
        /// Expression to print
        expr: Expr,
        /// Whether to HTML-escape the value
        escape: bool,
        /// Line of the tag
        line: usize,
    },
    /// Render another view in place
    Include {
        /// View name
        view: String,
        /// Line of the tag
        line: usize,
    },
    /// Conditional block
    If {
        /// `if` and `elseif` arms, in order
        branches: Vec<Branch>,
        /// `else` arm
        otherwise: Option<Vec<Node>>,
        /// Line of the opening tag
        line: usize,
    },
    /// Loop over an array or object
    Foreach {
        /// Iterated expression
        items: Expr,
        /// Name bound to each element
        binding: String,
        /// Loop body
        body: Vec<Node>,
        /// Line of the opening tag
        line: usize,
    },
}

/// One arm of a conditional
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// Condition guarding the arm
    pub condition: Expr,
    /// Arm body
    pub body: Vec<Node>,
}

/// An expression inside a tag
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Dotted lookup into the view data: `user.name`, `items.0`
    Path(Vec<String>),
    /// Engine metadata field: `this.app_name`
    This(String),
    /// Literal value
    Literal(Value),
    /// Logical negation
    Not(Box<Expr>),
}

/// Malformed script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// What is wrong
    pub message: String,
    /// Line where it was detected
    pub line: usize,
}

impl SyntaxError {
    fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

const BLOCK_TERMINATORS: [&str; 4] = ["elseif", "else", "endif", "endforeach"];

/// Deepest `<?if ?>` / `<?foreach ?>` nesting a script may use
pub const MAX_BLOCK_DEPTH: usize = 64;

/// Parse a complete script
pub fn parse(source: &str) -> Result<Vec<Node>, SyntaxError> {
    let mut parser = Parser::new(source);
    let (nodes, _) = parser.parse_nodes(false)?;
    Ok(nodes)
}

/// Parse a single expression
pub fn parse_expr(source: &str, line: usize) -> Result<Expr, SyntaxError> {
    let source = source.trim();

    if source.is_empty() {
        return Err(SyntaxError::new("Empty expression", line));
    }

    if let Some(rest) = source.strip_prefix('!') {
        return Ok(Expr::Not(Box::new(parse_expr(rest, line)?)));
    }

    if let Some(text) = parse_string_literal(source) {
        return Ok(Expr::Literal(Value::String(text)));
    }

    match source {
        "true" => return Ok(Expr::Literal(Value::Bool(true))),
        "false" => return Ok(Expr::Literal(Value::Bool(false))),
        "null" => return Ok(Expr::Literal(Value::Null)),
        _ => {}
    }

    if let Ok(number) = source.parse::<i64>() {
        return Ok(Expr::Literal(Value::from(number)));
    }
    if let Ok(number) = source.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(number) {
            return Ok(Expr::Literal(Value::Number(number)));
        }
    }

    let path = source.strip_prefix('$').unwrap_or(source);
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    if segments.iter().any(|s| !is_identifier(s)) {
        return Err(SyntaxError::new(
            format!("Invalid expression: {}", source),
            line,
        ));
    }

    if segments[0] == "this" {
        return match segments.as_slice() {
            [_, field] => Ok(Expr::This(field.clone())),
            _ => Err(SyntaxError::new(
                format!("Invalid metadata access: {}", source),
                line,
            )),
        };
    }

    Ok(Expr::Path(segments))
}

fn parse_string_literal(source: &str) -> Option<String> {
    let quote = source.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let inner = source.strip_prefix(quote)?.strip_suffix(quote)?;

    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(escaped) => text.push(escaped),
                None => text.push('\\'),
            }
        } else if ch == quote {
            return None;
        } else {
            text.push(ch);
        }
    }
    Some(text)
}

fn is_identifier(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A block-closing tag met while parsing a nested body
struct Terminator {
    keyword: String,
    args: String,
    line: usize,
}

enum Tag {
    Echo { source: String, escape: bool },
    Comment,
    Statement { keyword: String, args: String },
}

/// Internal parser state machine
struct Parser<'a> {
    content: &'a str,
    position: usize,
    line: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            content,
            position: 0,
            line: 1,
            depth: 0,
        }
    }

    fn parse_nodes(&mut self, nested: bool) -> Result<(Vec<Node>, Option<Terminator>), SyntaxError> {
        let mut nodes = Vec::new();

        while self.position < self.content.len() {
            if !self.rest().starts_with("<?") {
                let text = self.parse_text();
                if !text.is_empty() {
                    nodes.push(Node::Text(text));
                }
                continue;
            }

            let line = self.line;
            match self.read_tag()? {
                Tag::Comment => {}
                Tag::Echo { source, escape } => nodes.push(Node::Echo {
                    expr: parse_expr(&source, line)?,
                    escape,
                    line,
                }),
                Tag::Statement { keyword, args } => {
                    if BLOCK_TERMINATORS.contains(&keyword.as_str()) {
                        if nested {
                            return Ok((nodes, Some(Terminator { keyword, args, line })));
                        }
                        return Err(SyntaxError::new(
                            format!("Unexpected <?{} ?>", keyword),
                            line,
                        ));
                    }
                    nodes.push(self.parse_statement(&keyword, &args, line)?);
                }
            }
        }

        Ok((nodes, None))
    }

    fn parse_statement(&mut self, keyword: &str, args: &str, line: usize) -> Result<Node, SyntaxError> {
        match keyword {
            "include" => match parse_string_literal(args.trim()) {
                Some(view) if !view.is_empty() => Ok(Node::Include { view, line }),
                _ => Err(SyntaxError::new(
                    format!("include expects a quoted view name, got: {}", args.trim()),
                    line,
                )),
            },
            "if" | "foreach" => {
                if self.depth >= MAX_BLOCK_DEPTH {
                    return Err(SyntaxError::new(
                        format!("Blocks nested deeper than {} levels", MAX_BLOCK_DEPTH),
                        line,
                    ));
                }
                self.depth += 1;
                let node = if keyword == "if" {
                    self.parse_conditional(args, line)
                } else {
                    self.parse_loop(args, line)
                };
                self.depth -= 1;
                node
            }
            "" => Err(SyntaxError::new("Empty tag", line)),
            other => Err(SyntaxError::new(format!("Unknown statement: {}", other), line)),
        }
    }

    fn parse_conditional(&mut self, args: &str, line: usize) -> Result<Node, SyntaxError> {
        let mut branches = Vec::new();
        let mut otherwise = None;
        let mut condition = parse_expr(args, line)?;

        loop {
            let (body, end) = self.parse_nodes(true)?;
            let end = end.ok_or_else(|| {
                SyntaxError::new(format!("Unclosed <?if ?> opened on line {}", line), self.line)
            })?;

            match end.keyword.as_str() {
                "elseif" => {
                    branches.push(Branch { condition, body });
                    condition = parse_expr(&end.args, end.line)?;
                }
                "else" => {
                    branches.push(Branch { condition, body });
                    let (else_body, close) = self.parse_nodes(true)?;
                    match close {
                        Some(close) if close.keyword == "endif" => {
                            otherwise = Some(else_body);
                            break;
                        }
                        Some(close) => {
                            return Err(SyntaxError::new(
                                format!("Unexpected <?{} ?> after <?else ?>", close.keyword),
                                close.line,
                            ))
                        }
                        None => {
                            return Err(SyntaxError::new(
                                format!("Unclosed <?if ?> opened on line {}", line),
                                self.line,
                            ))
                        }
                    }
                }
                "endif" => {
                    branches.push(Branch { condition, body });
                    break;
                }
                other => {
                    return Err(SyntaxError::new(
                        format!("Unexpected <?{} ?> inside <?if ?>", other),
                        end.line,
                    ))
                }
            }
        }

        Ok(Node::If {
            branches,
            otherwise,
            line,
        })
    }

    fn parse_loop(&mut self, args: &str, line: usize) -> Result<Node, SyntaxError> {
        let (items, binding) = args.rsplit_once(" as ").ok_or_else(|| {
            SyntaxError::new(format!("foreach expects '<items> as <name>', got: {}", args.trim()), line)
        })?;

        let binding = binding.trim();
        let binding = binding.strip_prefix('$').unwrap_or(binding);
        if !is_identifier(binding) || binding == "this" {
            return Err(SyntaxError::new(format!("Invalid loop variable: {}", binding), line));
        }
        let items = parse_expr(items, line)?;

        let (body, end) = self.parse_nodes(true)?;
        match end {
            Some(end) if end.keyword == "endforeach" => Ok(Node::Foreach {
                items,
                binding: binding.to_string(),
                body,
                line,
            }),
            Some(end) => Err(SyntaxError::new(
                format!("Unexpected <?{} ?> inside <?foreach ?>", end.keyword),
                end.line,
            )),
            None => Err(SyntaxError::new(
                format!("Unclosed <?foreach ?> opened on line {}", line),
                self.line,
            )),
        }
    }

    fn parse_text(&mut self) -> String {
        let end = self
            .rest()
            .find("<?")
            .map(|offset| self.position + offset)
            .unwrap_or(self.content.len());

        let text = &self.content[self.position..end];
        self.line += text.matches('\n').count();
        self.position = end;
        text.to_string()
    }

    /// Read one `<? ... ?>` tag; a `?>` inside a quoted string does not close it
    fn read_tag(&mut self) -> Result<Tag, SyntaxError> {
        let start_line = self.line;
        self.position += 2;

        let body_start = self.position;
        // Comments may hold arbitrary text, so quotes only count in other tags.
        let quoted = !self.rest().starts_with('#');
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut body_end = None;

        for (offset, ch) in self.rest().char_indices() {
            if ch == '\n' {
                self.line += 1;
            }
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
                '\'' | '"' if quoted => quote = Some(ch),
                '?' if self.content[body_start + offset..].starts_with("?>") => {
                    body_end = Some(body_start + offset);
                    break;
                }
                _ => {}
            }
        }

        let body_end = body_end.ok_or_else(|| {
            SyntaxError::new("Unterminated tag, expected '?>'", start_line)
        })?;
        let body = &self.content[body_start..body_end];
        self.position = body_end + 2;

        let tag = if let Some(source) = body.strip_prefix('=') {
            Tag::Echo {
                source: source.to_string(),
                escape: true,
            }
        } else if let Some(source) = body.strip_prefix('!') {
            Tag::Echo {
                source: source.to_string(),
                escape: false,
            }
        } else if body.starts_with('#') {
            Tag::Comment
        } else {
            let body = body.trim();
            let split = body
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(body.len());
            Tag::Statement {
                keyword: body[..split].to_string(),
                args: body[split..].to_string(),
            }
        };

        Ok(tag)
    }

    fn rest(&self) -> &'a str {
        &self.content[self.position..]
    }
}
