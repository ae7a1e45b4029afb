use std::fmt;

/// Where a field lookup starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRoot {
    /// The current scope (`field`, `this`, `this.field`)
    Current,
    /// The enclosing scope, one level up (`../field`)
    Parent,
}

/// A parsed field reference such as `title`, `this.name` or `../title`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pub root: PathRoot,
    /// Object keys walked from the root; empty means the scope value itself.
    pub segments: Vec<String>,
}

impl FieldPath {
    pub fn current(segments: &[&str]) -> Self {
        Self {
            root: PathRoot::Current,
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn parent(segments: &[&str]) -> Self {
        Self {
            root: PathRoot::Parent,
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root == PathRoot::Parent {
            f.write_str("../")?;
        }
        if self.segments.is_empty() {
            f.write_str("this")
        } else {
            f.write_str(&self.segments.join("."))
        }
    }
}

/// A node of a compiled template.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal template text, emitted verbatim
    Text(String),
    /// `{{field}}`
    Variable(FieldPath),
    /// `{{#if field}} ... {{else}} ... {{/if}}`
    Conditional {
        path: FieldPath,
        then_branch: Vec<Node>,
        else_branch: Vec<Node>,
    },
    /// `{{#each field}} ... {{/each}}`
    Iteration { path: FieldPath, body: Vec<Node> },
}
