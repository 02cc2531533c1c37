//! Placeholder templates for the site page.
//!
//! The page template is plain HTML with a handful of `{{…}}` tags. Templates
//! are parsed once into a small AST and then rendered against the content
//! document; the text between tags is never interpreted.
//!
//! ## Tags
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `{{path}}` | string form of the value at `path` in the document |
//! | `{{#each path}}…{{/each}}` | repeat the enclosed fragment once per sequence element |
//! | `{{this}}` | the current element, when it is a scalar |
//! | `{{this.sub}}` | `sub` resolved against the current element |
//! | `{{@index}}` | zero-based position of the current element |
//!
//! `{{this…}}` and `{{@index}}` always refer to the innermost enclosing block.
//! A block path of the form `this.sub` is resolved against the enclosing
//! element, so nested lists can walk their parent item:
//!
//! ```text
//! {{#each services.items}}
//!   <h3>{{this.title}}</h3>
//!   <ul>{{#each this.points}}<li>{{this}}</li>{{/each}}</ul>
//! {{/each}}
//! ```
//!
//! Any other block path is resolved against the top-level document.
//!
//! ## Missing data
//!
//! A path that does not resolve, or resolves to `null`, renders as an empty
//! string. A block whose path is missing or is not a sequence renders nothing.
//! Neither is an error: content owners delete sections by deleting data.
//!
//! ## Malformed templates
//!
//! An `{{#each}}` without its `{{/each}}`, or a `{{/each}}` with no open block,
//! fails [`Template::parse`] with the byte offset of the offending tag.
//! Anything between `{{` and `}}` that is not one of the tags above (spaces
//! inside the braces, `{{@index}}` outside a block, …) is kept verbatim.

use crate::path::resolve;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum TemplateError {
    #[error("unclosed {{{{#each {path}}}}} opened at byte {offset}")]
    UnclosedBlock { path: String, offset: usize },
    #[error("{{{{/each}}}} at byte {offset} has no matching {{{{#each}}}}")]
    UnexpectedClose { offset: usize },
}

/// Where an `{{#each}}` block takes its sequence from.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockSource {
    /// Path resolved against the top-level document.
    Document(String),
    /// `this` (empty string) or `this.sub`, resolved against the enclosing element.
    Element(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    /// `{{path}}` resolved against the document.
    Field(String),
    /// `{{this}}` inside a block.
    Element,
    /// `{{this.sub}}` inside a block.
    ElementField(String),
    /// `{{@index}}` inside a block.
    Index,
    Each { source: BlockSource, body: Vec<Node> },
}

/// A parsed template, ready to render against any number of documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut parser = Parser {
            tokens: tokenize(source),
            pos: 0,
            depth: 0,
        };
        let nodes = parser.sequence(None)?;
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn render(&self, document: &Value) -> String {
        let mut out = String::new();
        render_nodes(&self.nodes, document, None, &mut out);
        out
    }

    /// Document-level field paths referenced by the template, in first-use order.
    ///
    /// Element-relative tags are not included; their paths depend on the data.
    pub fn field_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        collect_paths(&self.nodes, &mut paths);
        paths
    }
}

/// Parse and render in one step.
pub fn render(template: &str, document: &Value) -> Result<String, TemplateError> {
    Ok(Template::parse(template)?.render(document))
}

/// String form of a resolved value as it appears in rendered output.
///
/// Strings are inserted verbatim, numbers and booleans use their JSON text,
/// missing and `null` become empty, and containers render as compact JSON.
pub fn text_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Open(&'a str),
    Close,
    Field(&'a str),
    This,
    ThisField(&'a str),
    Index,
}

fn is_path(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
}

fn classify(inner: &str) -> Option<Token<'_>> {
    match inner {
        "/each" => return Some(Token::Close),
        "@index" => return Some(Token::Index),
        "this" => return Some(Token::This),
        _ => {}
    }
    if let Some(rest) = inner.strip_prefix("#each") {
        let path = rest.trim_start();
        return (path.len() < rest.len() && is_path(path)).then_some(Token::Open(path));
    }
    if !is_path(inner) {
        return None;
    }
    match inner.strip_prefix("this.") {
        Some(sub) if !sub.is_empty() => Some(Token::ThisField(sub)),
        _ => Some(Token::Field(inner)),
    }
}

/// Split the source into literal runs and tags, each with its byte offset.
fn tokenize(source: &str) -> Vec<(usize, Token<'_>)> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(found) = source[cursor..].find("{{") {
        let open = cursor + found;
        let body_start = open + 2;
        let tag = source[body_start..].find("}}").and_then(|len| {
            classify(&source[body_start..body_start + len]).map(|t| (t, body_start + len + 2))
        });

        match tag {
            Some((token, end)) => {
                if literal_start < open {
                    tokens.push((literal_start, Token::Text(&source[literal_start..open])));
                }
                tokens.push((open, token));
                cursor = end;
                literal_start = end;
            }
            // Not a tag: step over one brace so `{{{x}}}` still finds `{{x}}`.
            None => cursor = open + 1,
        }
    }

    if literal_start < source.len() {
        tokens.push((literal_start, Token::Text(&source[literal_start..])));
    }
    tokens
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    tokens: Vec<(usize, Token<'a>)>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Option<(usize, Token<'a>)> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    /// Parse nodes until the `{{/each}}` closing `open`, or end of input at top level.
    fn sequence(&mut self, open: Option<(usize, &'a str)>) -> Result<Vec<Node>, TemplateError> {
        let mut nodes = Vec::new();

        while let Some((offset, token)) = self.next() {
            let in_block = self.depth > 0;
            let node = match token {
                Token::Text(text) => Node::Text(text.to_string()),
                Token::Field(path) => Node::Field(path.to_string()),
                Token::This if in_block => Node::Element,
                Token::This => Node::Field("this".to_string()),
                Token::ThisField(sub) if in_block => Node::ElementField(sub.to_string()),
                Token::ThisField(sub) => Node::Field(format!("this.{sub}")),
                Token::Index if in_block => Node::Index,
                Token::Index => Node::Text("{{@index}}".to_string()),
                Token::Open(path) => {
                    let source = self.block_source(path);
                    self.depth += 1;
                    let body = self.sequence(Some((offset, path)))?;
                    self.depth -= 1;
                    Node::Each { source, body }
                }
                Token::Close => {
                    return match open {
                        Some(_) => Ok(nodes),
                        None => Err(TemplateError::UnexpectedClose { offset }),
                    };
                }
            };
            push_node(&mut nodes, node);
        }

        match open {
            Some((offset, path)) => Err(TemplateError::UnclosedBlock {
                path: path.to_string(),
                offset,
            }),
            None => Ok(nodes),
        }
    }

    fn block_source(&self, path: &str) -> BlockSource {
        if self.depth == 0 {
            return BlockSource::Document(path.to_string());
        }
        match path {
            "this" => BlockSource::Element(String::new()),
            _ => match path.strip_prefix("this.") {
                Some(sub) if !sub.is_empty() => BlockSource::Element(sub.to_string()),
                _ => BlockSource::Document(path.to_string()),
            },
        }
    }
}

/// Append a node, merging adjacent text runs.
fn push_node(nodes: &mut Vec<Node>, node: Node) {
    if let (Some(Node::Text(prev)), Node::Text(next)) = (nodes.last_mut(), &node) {
        prev.push_str(next);
        return;
    }
    nodes.push(node);
}

// ============================================================================
// Rendering
// ============================================================================

struct Frame<'v> {
    element: &'v Value,
    index: usize,
}

fn render_nodes(nodes: &[Node], document: &Value, frame: Option<&Frame<'_>>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Field(path) => out.push_str(&text_of(resolve(document, path))),
            Node::Index => {
                if let Some(frame) = frame {
                    out.push_str(&frame.index.to_string());
                }
            }
            Node::Element => match frame.map(|f| f.element) {
                Some(Value::Object(_) | Value::Array(_)) | None => {
                    out.push_str(&text_of(resolve(document, "this")))
                }
                Some(scalar) => out.push_str(&text_of(Some(scalar))),
            },
            Node::ElementField(sub) => {
                let value = frame.and_then(|f| resolve(f.element, sub));
                out.push_str(&text_of(value));
            }
            Node::Each { source, body } => {
                let items = match source {
                    BlockSource::Document(path) => resolve(document, path),
                    BlockSource::Element(sub) if sub.is_empty() => frame.map(|f| f.element),
                    BlockSource::Element(sub) => frame.and_then(|f| resolve(f.element, sub)),
                };
                if let Some(Value::Array(items)) = items {
                    for (index, element) in items.iter().enumerate() {
                        let inner = Frame { element, index };
                        render_nodes(body, document, Some(&inner), out);
                    }
                }
            }
        }
    }
}

fn collect_paths(nodes: &[Node], paths: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::Field(path) => add_path(paths, path),
            Node::Each { source, body } => {
                if let BlockSource::Document(path) = source {
                    add_path(paths, path);
                }
                collect_paths(body, paths);
            }
            _ => {}
        }
    }
}

fn add_path(paths: &mut Vec<String>, path: &str) {
    if !paths.iter().any(|p| p == path) {
        paths.push(path.to_string());
    }
}

/// True when every segment of a field path is usable as an address.
///
/// Used by `check` to flag placeholders like `{{items..title}}`.
pub fn is_well_formed_path(path: &str) -> bool {
    path.split('.').all(|segment| !segment.is_empty())
}
