//! Full HTML document around a rendered block list.

use regex::Regex;
use serde_json::Value;
use std::fmt::Write;
use std::sync::OnceLock;

use crate::sanitize::escape_html;

/// Page-level data needed for the document head
#[derive(Debug, Clone, Copy)]
pub struct PageMeta<'a> {
    pub title: &'a str,
    /// `seoSettings`: `title`, `description` and `noindex` are recognised
    pub seo_settings: &'a Value,
}

/// Wrap rendered block HTML in an HTML5 document.
///
/// Theme settings become CSS custom properties on `:root`.
pub fn render_document(meta: &PageMeta<'_>, body: &str, theme: Option<&Value>) -> String {
    let title = meta
        .seo_settings
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .unwrap_or(meta.title);

    let mut head = String::new();
    let _ = writeln!(head, "<title>{}</title>", escape_html(title));
    if let Some(description) = meta.seo_settings.get("description").and_then(Value::as_str) {
        let _ = writeln!(
            head,
            "<meta name=\"description\" content=\"{}\">",
            escape_html(description)
        );
    }
    if meta.seo_settings.get("noindex").and_then(Value::as_bool) == Some(true) {
        head.push_str("<meta name=\"robots\" content=\"noindex\">\n");
    }
    if let Some(css) = theme.map(theme_css).filter(|css| !css.is_empty()) {
        let _ = writeln!(head, "<style>{}</style>", css);
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
{}</head>
<body>
{}
</body>
</html>
"#,
        head, body
    )
}

/// `:root{--key:value;...}` for the scalar leaves of a theme settings object.
///
/// Nested keys are joined with `-` (`colors.primary` becomes
/// `--colors-primary`). Keys or values containing characters that could
/// break out of the declaration are dropped.
pub fn theme_css(settings: &Value) -> String {
    let mut vars = Vec::new();
    collect_vars("", settings, &mut vars);
    if vars.is_empty() {
        return String::new();
    }

    let mut css = String::from(":root{");
    for (name, value) in vars {
        let _ = write!(css, "--{}:{};", name, value);
    }
    css.push('}');
    css
}

fn collect_vars(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    let Value::Object(map) = value else {
        return;
    };
    for (key, child) in map {
        if !css_name_regex().is_match(key) {
            continue;
        }
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}-{}", prefix, key)
        };
        match child {
            Value::Object(_) => collect_vars(&name, child, out),
            Value::String(s) if css_value_regex().is_match(s) => out.push((name, s.clone())),
            Value::Number(n) => out.push((name, n.to_string())),
            _ => {}
        }
    }
}

fn css_name_regex() -> &'static Regex {
    static CSS_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    CSS_NAME_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").unwrap())
}

fn css_value_regex() -> &'static Regex {
    static CSS_VALUE_REGEX: OnceLock<Regex> = OnceLock::new();
    CSS_VALUE_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9#%.,()/ _-]+$").unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_head_from_seo_settings() {
        let seo = json!({ "description": "Fresh \"bread\" daily", "noindex": true });
        let meta = PageMeta {
            title: "Bakery <Home>",
            seo_settings: &seo,
        };
        let html = render_document(&meta, "<h1>Hi</h1>", None);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Bakery &lt;Home&gt;</title>"));
        assert!(html.contains("<meta name=\"description\" content=\"Fresh &quot;bread&quot; daily\">"));
        assert!(html.contains("<meta name=\"robots\" content=\"noindex\">"));
        assert!(html.contains("<body>\n<h1>Hi</h1>\n</body>"));
        assert!(!html.contains("<style>"));
    }

    #[test]
    fn test_seo_title_overrides_page_title() {
        let seo = json!({ "title": "Best Bakery" });
        let meta = PageMeta {
            title: "Home",
            seo_settings: &seo,
        };
        assert!(render_document(&meta, "", None).contains("<title>Best Bakery</title>"));
    }

    #[test]
    fn test_theme_css_variables() {
        let settings = json!({
            "colors": { "primary": "#ff6600", "text": "rgb(10, 10, 10)" },
            "radius": 4,
            "font": "Inter, sans-serif"
        });
        assert_eq!(
            theme_css(&settings),
            ":root{--colors-primary:#ff6600;--colors-text:rgb(10, 10, 10);--font:Inter, sans-serif;--radius:4;}"
        );
    }

    #[test]
    fn test_theme_css_drops_unsafe_entries() {
        let settings = json!({
            "primary": "red;}</style><script>",
            "bad key": "#fff",
            "dark": true,
            "accent": "#00ff00"
        });
        assert_eq!(theme_css(&settings), ":root{--accent:#00ff00;}");
        assert_eq!(theme_css(&json!({})), "");
        assert_eq!(theme_css(&json!("red")), "");
    }
}
