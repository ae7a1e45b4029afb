//! # Blockpage block rendering
//!
//! Turns a page's ordered list of typed blocks into HTML.
//!
//! ## Features
//! - Block templates compiled once into a node tree (`{{field}}`, `{{#if}}`, `{{#each}}`)
//! - Recursive HTML escaping of block config, with `content` reserved for trusted rich text
//! - Immutable block type registry with atomic reload
//! - Per-block failure isolation: a bad block never breaks the page
//!
//! ## Example
//! ```
//! use blockpage_render::{load_registry, render_page, BlockInstance, BlockType};
//! use serde_json::json;
//!
//! let registry = load_registry(vec![BlockType::new("hero", "<h1>{{title}}</h1>")]).unwrap();
//! let blocks = vec![BlockInstance::new("hero", json!({ "title": "<script>x</script>" }))];
//!
//! assert_eq!(render_page(&blocks, &registry), "<h1>&lt;script&gt;x&lt;/script&gt;</h1>");
//! ```

pub mod block;
pub mod document;
pub mod error;
pub mod registry;
pub mod renderer;
pub mod sanitize;
pub mod schema;
pub mod template;

// --- Core types ---
pub use block::{BlockInstance, BlockType};
pub use document::PageMeta;
pub use error::{RenderError, RenderResult};
pub use registry::{CompiledBlockType, Registry, RegistryHandle};
pub use schema::{BlockSchema, SchemaIssue};
pub use template::CompiledTemplate;

/// Compile every enabled block type into a registry.
pub fn load_registry<I>(rows: I) -> RenderResult<Registry>
where
    I: IntoIterator<Item = BlockType>,
{
    Registry::load(rows)
}

/// Render an ordered block list to HTML.
pub fn render_page(blocks: &[BlockInstance], registry: &Registry) -> String {
    renderer::render_page(blocks, registry)
}

/// Compile a single template.
pub fn compile(template: &str) -> RenderResult<CompiledTemplate> {
    template::compile(template)
}

/// Escape a block config for rendering.
pub fn sanitize(config: &serde_json::Value) -> serde_json::Value {
    sanitize::sanitize(config)
}

/// Parse block type definitions from YAML: a single definition or a list.
pub fn parse_block_types(yaml: &str) -> RenderResult<Vec<BlockType>> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    if value.is_sequence() {
        Ok(serde_yaml::from_value(value)?)
    } else {
        Ok(vec![serde_yaml::from_value(value)?])
    }
}
