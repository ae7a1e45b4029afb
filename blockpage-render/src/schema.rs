//! Advisory block config schemas.
//!
//! A block type's `schema` describes the fields its template expects:
//!
//! ```json
//! { "fields": { "title": { "type": "string", "required": true },
//!               "items": { "type": "array" } } }
//! ```
//!
//! Nothing in rendering or persistence enforces it. [`check`] reports
//! mismatches for editors and the `blockpage-check` tool.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::RenderResult;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockSchema {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    /// Rich text, stored as a string
    Html,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldType::String | FieldType::Html => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Html => "html",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaIssue {
    MissingField { field: String },
    WrongType { field: String, expected: FieldType },
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaIssue::MissingField { field } => write!(f, "missing required field '{}'", field),
            SchemaIssue::WrongType { field, expected } => {
                write!(f, "field '{}' should be of type {}", field, expected)
            }
        }
    }
}

impl BlockSchema {
    /// Parse a stored schema value; `null` means "no schema".
    pub fn from_value(schema: &Value) -> RenderResult<Self> {
        if schema.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(schema.clone())?)
    }

    pub fn check(&self, config: &Value) -> Vec<SchemaIssue> {
        let mut issues = Vec::new();
        for (name, field) in &self.fields {
            match config.get(name) {
                None | Some(Value::Null) => {
                    if field.required {
                        issues.push(SchemaIssue::MissingField {
                            field: name.clone(),
                        });
                    }
                }
                Some(value) if !field.field_type.accepts(value) => {
                    issues.push(SchemaIssue::WrongType {
                        field: name.clone(),
                        expected: field.field_type,
                    });
                }
                Some(_) => {}
            }
        }
        issues
    }
}

/// Check a config against a stored schema value.
pub fn check(schema: &Value, config: &Value) -> RenderResult<Vec<SchemaIssue>> {
    Ok(BlockSchema::from_value(schema)?.check(config))
}
