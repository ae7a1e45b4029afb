//! Block template compiler.
//!
//! Templates are compiled once into a [`Node`] tree and rendered any number
//! of times. The grammar is deliberately small:
//!
//! - `{{field}}`, `{{a.b}}`, `{{this}}`, `{{this.field}}`, `{{../field}}`
//! - `{{#if field}} ... {{else}} ... {{/if}}`
//! - `{{#each field}} ... {{/each}}`
//!
//! Any other tag is a [`RenderError::TemplateSyntax`]. Substituted values are
//! written as-is; escaping is the sanitizer's job.

pub mod lexer;
pub mod node;
pub mod parser;
pub mod scope;

use serde_json::Value;

use crate::error::{RenderError, RenderResult};

pub use node::{FieldPath, Node, PathRoot};
pub use scope::Scope;

/// A parsed template, immutable and shareable across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    nodes: Vec<Node>,
}

/// Compile template text into an executable node tree.
pub fn compile(src: &str) -> RenderResult<CompiledTemplate> {
    parser::parse(src).map(|nodes| CompiledTemplate { nodes })
}

impl CompiledTemplate {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Render against a root value (normally a sanitized block config).
    pub fn render(&self, data: &Value) -> RenderResult<String> {
        let mut out = String::new();
        render_nodes(&self.nodes, &Scope::root(data), &mut out).map_err(|message| {
            RenderError::BlockRender {
                block_type: String::new(),
                message,
            }
        })?;
        Ok(out)
    }
}

fn render_nodes(nodes: &[Node], scope: &Scope<'_>, out: &mut String) -> Result<(), String> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Variable(path) => {
                if let Some(value) = scope.lookup(path) {
                    let text = scope::stringify(value).map_err(|e| format!("{{{{{}}}}}: {}", path, e))?;
                    out.push_str(&text);
                }
            }
            Node::Conditional {
                path,
                then_branch,
                else_branch,
            } => {
                let branch = if scope::is_truthy(scope.lookup(path)) {
                    then_branch
                } else {
                    else_branch
                };
                render_nodes(branch, scope, out)?;
            }
            Node::Iteration { path, body } => match scope.lookup(path) {
                None | Some(Value::Null) => {}
                Some(Value::Array(items)) => {
                    for item in items {
                        render_nodes(body, &scope.child(item), out)?;
                    }
                }
                Some(other) => {
                    return Err(format!(
                        "{{{{#each {}}}}} expects an array, found {}",
                        path,
                        type_name(other)
                    ));
                }
            },
        }
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
