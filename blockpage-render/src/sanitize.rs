//! Recursive HTML escaping of block configuration.

use serde_json::{Map, Value};

/// The one config key whose string value is trusted rich HTML and passes through verbatim.
pub const RAW_HTML_FIELD: &str = "content";

/// Escape `&`, `<`, `>`, `"` and `'` for safe inclusion in HTML text and attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

/// Return a copy of `config` with every string escaped except direct `content` fields.
///
/// Numbers, booleans and nulls are left untouched.
///
/// Objects nested anywhere (including inside arrays) follow the same rule
/// at their own key level; the exemption is never inherited from a parent key.
pub fn sanitize(config: &Value) -> Value {
    match config {
        Value::String(s) => Value::String(escape_html(s)),
        Value::Object(map) => Value::Object(sanitize_object(map)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        scalar => scalar.clone(),
    }
}

fn sanitize_object(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let clean = match value {
                Value::String(s) if key == RAW_HTML_FIELD => Value::String(s.clone()),
                other => sanitize(other),
            };
            (key.clone(), clean)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_html_all_entities() {
        assert_eq!(
            escape_html(r#"<a href="x" title='y'>&</a>"#),
            "&lt;a href=&quot;x&quot; title=&#039;y&#039;&gt;&amp;&lt;/a&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_sanitize_escapes_strings() {
        let config = json!({ "title": "<script>alert(1)</script>", "subtitle": "Welcome" });
        assert_eq!(
            sanitize(&config),
            json!({ "title": "&lt;script&gt;alert(1)&lt;/script&gt;", "subtitle": "Welcome" })
        );
    }

    #[test]
    fn test_content_field_passes_through() {
        let config = json!({ "content": "<p>Hello <em>world</em></p>", "caption": "<em>" });
        let clean = sanitize(&config);
        assert_eq!(clean["content"], json!("<p>Hello <em>world</em></p>"));
        assert_eq!(clean["caption"], json!("&lt;em&gt;"));
    }

    #[test]
    fn test_nested_objects_and_arrays() {
        let config = json!({
            "items": [
                { "name": "<b>", "content": "<i>ok</i>", "price": 10 },
                "<u>",
                7,
                ["<s>"]
            ],
            "author": { "name": "A & B", "content": "<br>" },
            "visible": true,
            "empty": null
        });
        assert_eq!(
            sanitize(&config),
            json!({
                "items": [
                    { "name": "&lt;b&gt;", "content": "<i>ok</i>", "price": 10 },
                    "&lt;u&gt;",
                    7,
                    ["&lt;s&gt;"]
                ],
                "author": { "name": "A &amp; B", "content": "<br>" },
                "visible": true,
                "empty": null
            })
        );
    }

    #[test]
    fn test_content_exemption_not_inherited() {
        let config = json!({ "content": ["<b>", { "title": "<i>" }] });
        assert_eq!(
            sanitize(&config),
            json!({ "content": ["&lt;b&gt;", { "title": "&lt;i&gt;" }] })
        );
        let config = json!({ "content": { "body": "<p>" } });
        assert_eq!(sanitize(&config), json!({ "content": { "body": "&lt;p&gt;" } }));
    }

    #[test]
    fn test_scalar_config() {
        assert_eq!(sanitize(&json!(5)), json!(5));
        assert_eq!(sanitize(&json!(true)), json!(true));
        assert_eq!(sanitize(&json!("<b>")), json!("&lt;b&gt;"));
        assert_eq!(sanitize(&json!(null)), json!(null));
    }
}
