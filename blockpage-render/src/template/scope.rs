use serde_json::{Number, Value};
use std::borrow::Cow;

use crate::template::node::{FieldPath, PathRoot};

/// Data context a template executes against.
///
/// The root scope is the block config; each `{{#each}}` element gets a child
/// scope whose parent stays reachable through `../`.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    this: &'a Value,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    pub fn root(value: &'a Value) -> Self {
        Self {
            this: value,
            parent: None,
        }
    }

    pub fn child<'s>(&'s self, value: &'s Value) -> Scope<'s> {
        Scope {
            this: value,
            parent: Some(self),
        }
    }

    /// Resolve a field path. Missing keys resolve to `None`.
    pub fn lookup(&self, path: &FieldPath) -> Option<&'a Value> {
        let start = match path.root {
            PathRoot::Current => self.this,
            PathRoot::Parent => self.parent?.this,
        };
        path.segments
            .iter()
            .try_fold(start, |value, segment| step(value, segment))
    }
}

fn step<'v>(value: &'v Value, segment: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Missing, `null`, `false`, `0`, `""` and `[]` are falsy; everything else is truthy.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(_)) => true,
    }
}

/// Text substituted for a `{{field}}` tag.
///
/// Arrays of scalars join with `,`; objects have no text form.
pub fn stringify(value: &Value) -> Result<Cow<'_, str>, String> {
    match value {
        Value::Null => Ok(Cow::Borrowed("")),
        Value::Bool(b) => Ok(Cow::Owned(b.to_string())),
        Value::Number(n) => Ok(Cow::Owned(format_number(n))),
        Value::String(s) => Ok(Cow::Borrowed(s)),
        Value::Array(items) => {
            let parts = items
                .iter()
                .map(|item| match item {
                    Value::Array(_) | Value::Object(_) => {
                        Err("cannot render a nested array or object as text".to_string())
                    }
                    scalar => stringify(scalar).map(Cow::into_owned),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Cow::Owned(parts.join(",")))
        }
        Value::Object(_) => Err("cannot render an object as text".to_string()),
    }
}

/// JSON-style number text: integral floats print without a fraction,
/// `-0.0` prints as `0` and magnitudes from `1e21` up use exponent form.
fn format_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() => {
            if f == 0.0 {
                "0".to_string()
            } else if f.abs() >= 1e21 {
                format!("{:e}", f)
            } else if f.fract() == 0.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        _ => n.to_string(),
    }
}
