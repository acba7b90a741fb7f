//! Template compilation and rendering.
//!
//! A small mustache dialect, just large enough for the bundled Swift
//! templates: `{{name}}` interpolation, `{{#section}}`/`{{^section}}` blocks
//! over booleans, lists, and nested maps, `{{!comment}}`, and the `-first` /
//! `-last` position variables inside list sections (used to comma-separate
//! parameter lists).
//!
//! Rendering is a pure function of (compiled template, context). The context
//! is a [`serde_json::Value`]: string and boolean scalars plus ordered lists
//! of nested maps. A missing key renders as the empty string for variables
//! and as falsy for sections; templates and processors agree on the full
//! schema, so this default never hides a bug in shipped templates.

use serde_json::Value;
use std::fmt;

/// The bundled template failed to parse. Fatal at process start: no
/// processor can produce correct output without its template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    message: String,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template compile error: {}", self.message)
    }
}

impl std::error::Error for CompileError {}

fn compile_error(message: impl Into<String>) -> CompileError {
    CompileError {
        message: message.into(),
    }
}

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Variable(String),
    Section {
        name: String,
        inverted: bool,
        children: Vec<Node>,
    },
}

/// A compiled template, reusable across renders.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn compile(source: &str) -> Result<Template, CompileError> {
        // (section name, inverted, nodes accumulated *before* the section).
        let mut stack: Vec<(String, bool, Vec<Node>)> = Vec::new();
        let mut current: Vec<Node> = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                current.push(Node::Text(rest[..open].to_string()));
            }
            rest = &rest[open + 2..];
            let close = rest
                .find("}}")
                .ok_or_else(|| compile_error("unclosed '{{' tag"))?;
            let tag = rest[..close].trim();
            rest = &rest[close + 2..];

            match tag.chars().next() {
                None => return Err(compile_error("empty tag")),
                Some('!') => {}
                Some('#') | Some('^') => {
                    let name = tag[1..].trim().to_string();
                    if name.is_empty() {
                        return Err(compile_error("section tag without a name"));
                    }
                    let inverted = tag.starts_with('^');
                    stack.push((name, inverted, std::mem::take(&mut current)));
                }
                Some('/') => {
                    let name = tag[1..].trim();
                    let (open_name, inverted, mut parent) = stack.pop().ok_or_else(|| {
                        compile_error(format!("close tag '{}' without open section", name))
                    })?;
                    if open_name != name {
                        return Err(compile_error(format!(
                            "section '{}' closed by '{}'",
                            open_name, name
                        )));
                    }
                    parent.push(Node::Section {
                        name: open_name,
                        inverted,
                        children: std::mem::take(&mut current),
                    });
                    current = parent;
                }
                Some(_) => current.push(Node::Variable(tag.to_string())),
            }
        }

        if let Some((name, _, _)) = stack.last() {
            return Err(compile_error(format!("unclosed section '{}'", name)));
        }
        if !rest.is_empty() {
            current.push(Node::Text(rest.to_string()));
        }

        Ok(Template { nodes: current })
    }

    /// Renders against `context`. Deterministic: same template and context
    /// always yield the same text.
    pub fn render(&self, context: &Value) -> String {
        let mut out = String::new();
        let mut frames = vec![Frame::Scope(context)];
        render_nodes(&self.nodes, &mut frames, &mut out);
        out
    }
}

enum Frame<'a> {
    Scope(&'a Value),
    /// One element of a list section, with its position in the list.
    Item {
        value: &'a Value,
        first: bool,
        last: bool,
    },
}

static VALUE_TRUE: Value = Value::Bool(true);
static VALUE_FALSE: Value = Value::Bool(false);

fn resolve<'a>(frames: &[Frame<'a>], name: &str) -> Option<&'a Value> {
    if name == "-first" || name == "-last" {
        for frame in frames.iter().rev() {
            if let Frame::Item { first, last, .. } = frame {
                let hit = if name == "-first" { *first } else { *last };
                return Some(if hit { &VALUE_TRUE } else { &VALUE_FALSE });
            }
        }
        return None;
    }

    for frame in frames.iter().rev() {
        let value: &'a Value = match frame {
            Frame::Scope(value) => value,
            Frame::Item { value, .. } => value,
        };
        if let Value::Object(map) = value {
            if let Some(found) = map.get(name) {
                return Some(found);
            }
        }
    }
    None
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn render_nodes<'a>(nodes: &'a [Node], frames: &mut Vec<Frame<'a>>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Variable(name) => {
                if let Some(value) = resolve(frames, name) {
                    render_scalar(value, out);
                }
            }
            Node::Section {
                name,
                inverted,
                children,
            } => {
                let value = resolve(frames, name);
                if *inverted {
                    if !is_truthy(value) {
                        render_nodes(children, frames, out);
                    }
                    continue;
                }
                match value {
                    Some(Value::Array(items)) if !items.is_empty() => {
                        let last_index = items.len() - 1;
                        for (index, item) in items.iter().enumerate() {
                            frames.push(Frame::Item {
                                value: item,
                                first: index == 0,
                                last: index == last_index,
                            });
                            render_nodes(children, frames, out);
                            frames.pop();
                        }
                    }
                    Some(scope @ Value::Object(_)) => {
                        frames.push(Frame::Scope(scope));
                        render_nodes(children, frames, out);
                        frames.pop();
                    }
                    other if is_truthy(other) => render_nodes(children, frames, out),
                    _ => {}
                }
            }
        }
    }
}

fn render_scalar(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        // Null and composites have no scalar text.
        _ => {}
    }
}
