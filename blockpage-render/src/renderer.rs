//! Page rendering: ordered blocks in, one HTML fragment out.
//!
//! Every block renders independently. An unknown type or a failing template
//! becomes an HTML comment marker and the remaining blocks still render.

use chrono::{Datelike, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use crate::block::BlockInstance;
use crate::error::{RenderError, RenderResult};
use crate::registry::Registry;
use crate::sanitize::{escape_html, sanitize};

/// Synthesized scope field holding the current calendar year.
pub const YEAR_FIELD: &str = "year";
/// Synthesized scope field holding the unsanitized config as a JSON string.
pub const JSON_CONFIG_FIELD: &str = "jsonConfig";

/// Render a block list with the current year.
pub fn render_page(blocks: &[BlockInstance], registry: &Registry) -> String {
    render_page_for_year(blocks, registry, Utc::now().year())
}

/// Render a block list with a fixed value for the `year` field.
pub fn render_page_for_year(blocks: &[BlockInstance], registry: &Registry, year: i32) -> String {
    let mut html = String::new();
    for (index, block) in blocks.iter().enumerate() {
        match render_block(block, registry, year) {
            Ok(fragment) => html.push_str(&fragment),
            Err(RenderError::UnknownBlockType { block_type }) => {
                warn!(index, block_type = %block_type, "skipping block of unknown type");
                html.push_str(&unknown_marker(&block_type));
            }
            Err(err) => {
                warn!(index, block_type = %block.block_type, error = %err, "block failed to render");
                html.push_str(&error_marker(&block.block_type));
            }
        }
    }
    html
}

/// Render one block, surfacing failures instead of emitting markers.
pub fn render_block(block: &BlockInstance, registry: &Registry, year: i32) -> RenderResult<String> {
    let compiled = registry.get(&block.block_type)?;
    let scope = build_scope(&block.config, year).map_err(|e| e.with_block_type(compiled.name()))?;
    compiled
        .template()
        .render(&scope)
        .map_err(|e| e.with_block_type(compiled.name()))
}

/// Sanitized config plus the synthesized `year` and `jsonConfig` fields.
///
/// A config that is not an object contributes no fields of its own.
pub fn build_scope(config: &Value, year: i32) -> RenderResult<Value> {
    let raw_json = serde_json::to_string(config).map_err(|e| RenderError::BlockRender {
        block_type: String::new(),
        message: format!("cannot serialize config: {}", e),
    })?;

    let mut scope = match sanitize(config) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    scope.insert(YEAR_FIELD.to_string(), Value::from(year));
    scope.insert(JSON_CONFIG_FIELD.to_string(), Value::String(raw_json));
    Ok(Value::Object(scope))
}

pub fn unknown_marker(block_type: &str) -> String {
    format!("<!-- Unknown block type: {} -->", escape_html(block_type))
}

pub fn error_marker(block_type: &str) -> String {
    format!("<!-- Error rendering {} block -->", escape_html(block_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockType;
    use serde_json::json;

    fn registry() -> Registry {
        Registry::load(vec![
            BlockType::new("hero", "<h1>{{title}}</h1>"),
            BlockType::new("footer", "<footer>&copy; {{year}} {{company}}</footer>"),
            BlockType::new("widget", "<div data-config='{{jsonConfig}}'></div>"),
            BlockType::new("list", "{{#each items}}<li>{{this}}</li>{{/each}}"),
        ])
        .unwrap()
    }

    #[test]
    fn test_escapes_script_in_title() {
        let blocks = vec![BlockInstance::new(
            "hero",
            json!({ "title": "<script>alert(1)</script>", "subtitle": "Welcome" }),
        )];
        assert_eq!(
            render_page_for_year(&blocks, &registry(), 2024),
            "<h1>&lt;script&gt;alert(1)&lt;/script&gt;</h1>"
        );
    }

    #[test]
    fn test_year_field() {
        let blocks = vec![BlockInstance::new("footer", json!({ "company": "Acme" }))];
        assert_eq!(
            render_page_for_year(&blocks, &registry(), 2031),
            "<footer>&copy; 2031 Acme</footer>"
        );
    }

    #[test]
    fn test_current_year_is_used_by_default() {
        let blocks = vec![BlockInstance::new("footer", json!({ "company": "Acme" }))];
        let html = render_page(&blocks, &registry());
        assert!(html.contains(&Utc::now().year().to_string()));
    }

    #[test]
    fn test_json_config_is_unsanitized() {
        let config = json!({ "label": "<b>" });
        let blocks = vec![BlockInstance::new("widget", config.clone())];
        let expected = format!("<div data-config='{}'></div>", serde_json::to_string(&config).unwrap());
        assert_eq!(render_page_for_year(&blocks, &registry(), 2024), expected);
    }

    #[test]
    fn test_unknown_type_marker() {
        let blocks = vec![
            BlockInstance::new("hero", json!({ "title": "A" })),
            BlockInstance::new("carousel", json!({})),
            BlockInstance::new("hero", json!({ "title": "B" })),
        ];
        assert_eq!(
            render_page_for_year(&blocks, &registry(), 2024),
            "<h1>A</h1><!-- Unknown block type: carousel --><h1>B</h1>"
        );
    }

    #[test]
    fn test_marker_escapes_type_name() {
        let blocks = vec![BlockInstance::new("--><script>", json!({}))];
        let html = render_page_for_year(&blocks, &registry(), 2024);
        assert_eq!(html, "<!-- Unknown block type: --&gt;&lt;script&gt; -->");
    }

    #[test]
    fn test_render_error_is_isolated() {
        let blocks = vec![
            BlockInstance::new("list", json!({ "items": "not a list" })),
            BlockInstance::new("hero", json!({ "title": "still here" })),
        ];
        assert_eq!(
            render_page_for_year(&blocks, &registry(), 2024),
            "<!-- Error rendering list block --><h1>still here</h1>"
        );
    }

    #[test]
    fn test_render_block_reports_error_with_type() {
        let block = BlockInstance::new("list", json!({ "items": 3 }));
        match render_block(&block, &registry(), 2024) {
            Err(RenderError::BlockRender { block_type, .. }) => assert_eq!(block_type, "list"),
            other => panic!("Expected render error, got {:?}", other),
        }
    }

    #[test]
    fn test_synthesized_fields_override_config() {
        let scope = build_scope(&json!({ "year": "<1999>", "title": "x" }), 2024).unwrap();
        assert_eq!(scope["year"], json!(2024));
        assert_eq!(scope["title"], json!("x"));
        let raw: Value = serde_json::from_str(scope["jsonConfig"].as_str().unwrap()).unwrap();
        assert_eq!(raw, json!({ "year": "<1999>", "title": "x" }));
    }

    #[test]
    fn test_non_object_config_scope() {
        let scope = build_scope(&json!("<b>"), 2024).unwrap();
        assert_eq!(scope, json!({ "year": 2024, "jsonConfig": "\"<b>\"" }));
    }
}
