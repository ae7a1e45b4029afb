use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An admin-defined block type: a template plus default config and schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockType {
    /// Unique key referenced by [`BlockInstance::block_type`]
    pub name: String,
    #[serde(default)]
    pub category: String,
    /// Raw template text
    pub template: String,
    #[serde(default = "empty_object")]
    pub default_config: Value,
    /// Declarative shape of the config; advisory only
    #[serde(default)]
    pub schema: Value,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn enabled_by_default() -> bool {
    true
}

impl BlockType {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: String::new(),
            template: template.into(),
            default_config: empty_object(),
            schema: Value::Null,
            enabled: true,
        }
    }

    /// A new block of this type, seeded with a copy of the default config.
    pub fn instantiate(&self) -> BlockInstance {
        BlockInstance {
            block_type: self.name.clone(),
            config: self.default_config.clone(),
        }
    }
}

/// One entry of a page's ordered block list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInstance {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default = "empty_object")]
    pub config: Value,
}

impl BlockInstance {
    pub fn new(block_type: impl Into<String>, config: Value) -> Self {
        Self {
            block_type: block_type.into(),
            config,
        }
    }
}
