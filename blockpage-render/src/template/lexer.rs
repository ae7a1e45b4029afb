use crate::error::{RenderError, RenderResult};
use crate::template::node::{FieldPath, PathRoot};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Line/column of a token's first character, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn error(self, message: impl Into<String>) -> RenderError {
        RenderError::TemplateSyntax {
            block_type: String::new(),
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    Text(&'a str),
    Tag { body: &'a str, pos: Position },
}

/// A classified `{{ ... }}` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Variable(FieldPath),
    OpenIf(FieldPath),
    OpenEach(FieldPath),
    Else,
    CloseIf,
    CloseEach,
}

/// Split template text into literal text and `{{ ... }}` tags.
pub fn tokenize(src: &str) -> RenderResult<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = src;
    let mut pos = Position { line: 1, column: 1 };

    while let Some(start) = rest.find(OPEN) {
        let (text, tail) = rest.split_at(start);
        if !text.is_empty() {
            tokens.push(Token::Text(text));
        }
        advance(&mut pos, text);

        let inner = &tail[OPEN.len()..];
        let end = inner
            .find(CLOSE)
            .ok_or_else(|| pos.error("unclosed '{{': expected '}}'"))?;
        tokens.push(Token::Tag {
            body: &inner[..end],
            pos,
        });

        let consumed = &tail[..OPEN.len() + end + CLOSE.len()];
        advance(&mut pos, consumed);
        rest = &tail[consumed.len()..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    Ok(tokens)
}

fn advance(pos: &mut Position, text: &str) {
    for c in text.chars() {
        if c == '\n' {
            pos.line += 1;
            pos.column = 1;
        } else {
            pos.column += 1;
        }
    }
}

/// Classify a tag body. Anything outside the supported grammar is rejected.
pub fn classify(body: &str) -> Result<Directive, String> {
    let body = body.trim();
    if body.is_empty() {
        return Err("empty tag '{{}}'".to_string());
    }

    if let Some(helper) = body.strip_prefix('#') {
        let mut words = helper.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();
        if name != "if" && name != "each" {
            return Err(format!("unknown helper '#{}'", name));
        }
        let field = match args.as_slice() {
            [field] => parse_path(field)?,
            [] => return Err(format!("'#{}' requires a field", name)),
            _ => return Err(format!("'#{}' takes exactly one field", name)),
        };
        return Ok(if name == "if" {
            Directive::OpenIf(field)
        } else {
            Directive::OpenEach(field)
        });
    }

    if let Some(name) = body.strip_prefix('/') {
        return match name.trim() {
            "if" => Ok(Directive::CloseIf),
            "each" => Ok(Directive::CloseEach),
            other => Err(format!("unknown closing tag '/{}'", other)),
        };
    }

    if body == "else" {
        return Ok(Directive::Else);
    }

    if let Some(first) = body.split_whitespace().next().filter(|w| *w != body) {
        return Err(format!("unknown helper '{}'", first));
    }

    parse_path(body).map(Directive::Variable)
}

/// Parse `field`, `a.b`, `this`, `this.field`, `../field`.
pub fn parse_path(raw: &str) -> Result<FieldPath, String> {
    let (root, rest) = match raw.strip_prefix("../") {
        Some(rest) => (PathRoot::Parent, rest),
        None => (PathRoot::Current, raw),
    };

    if rest.starts_with("../") {
        return Err(format!(
            "'{}': only one level of '../' is supported",
            raw
        ));
    }

    let rest = if rest == "this" {
        ""
    } else {
        rest.strip_prefix("this.").unwrap_or(rest)
    };

    if rest.is_empty() {
        if raw.ends_with("this") {
            return Ok(FieldPath {
                root,
                segments: Vec::new(),
            });
        }
        return Err(format!("'{}' is not a valid field reference", raw));
    }

    let mut segments = Vec::new();
    for segment in rest.split('.') {
        if segment.is_empty() || !segment.chars().all(is_field_char) {
            return Err(format!("'{}' is not a valid field reference", raw));
        }
        segments.push(segment.to_string());
    }
    Ok(FieldPath { root, segments })
}

fn is_field_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_text_and_tags() {
        let tokens = tokenize("<h1>{{title}}</h1>").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], Token::Text("<h1>"));
        assert!(matches!(tokens[1], Token::Tag { body: "title", .. }));
        assert_eq!(tokens[2], Token::Text("</h1>"));
    }

    #[test]
    fn test_tokenize_tracks_position() {
        let tokens = tokenize("line one\n  {{x}}").unwrap();
        match tokens[1] {
            Token::Tag { pos, .. } => assert_eq!(pos, Position { line: 2, column: 3 }),
            _ => panic!("Expected tag"),
        }
    }

    #[test]
    fn test_tokenize_unclosed_tag() {
        let err = tokenize("<p>{{title</p>").unwrap_err();
        assert!(matches!(
            err,
            RenderError::TemplateSyntax { line: 1, column: 4, .. }
        ));
    }

    #[test]
    fn test_classify_directives() {
        assert_eq!(
            classify(" #if  visible ").unwrap(),
            Directive::OpenIf(FieldPath::current(&["visible"]))
        );
        assert_eq!(
            classify("#each items").unwrap(),
            Directive::OpenEach(FieldPath::current(&["items"]))
        );
        assert_eq!(classify("else").unwrap(), Directive::Else);
        assert_eq!(classify("/if").unwrap(), Directive::CloseIf);
        assert_eq!(classify("/each").unwrap(), Directive::CloseEach);
    }

    #[test]
    fn test_classify_rejects_unknown_helpers() {
        assert!(classify("#with author").unwrap_err().contains("unknown helper"));
        assert!(classify("#unless x").is_err());
        assert!(classify("uppercase title").unwrap_err().contains("'uppercase'"));
        assert!(classify("/with").is_err());
        assert!(classify("{raw").is_err());
        assert!(classify("#if").is_err());
        assert!(classify("#if a b").is_err());
    }

    #[test]
    fn test_parse_paths() {
        assert_eq!(parse_path("this").unwrap(), FieldPath::current(&[]));
        assert_eq!(
            parse_path("this.name").unwrap(),
            FieldPath::current(&["name"])
        );
        assert_eq!(
            parse_path("../title").unwrap(),
            FieldPath::parent(&["title"])
        );
        assert_eq!(
            parse_path("author.name").unwrap(),
            FieldPath::current(&["author", "name"])
        );
        assert_eq!(parse_path("../this").unwrap(), FieldPath::parent(&[]));
    }

    #[test]
    fn test_parse_path_rejects_invalid() {
        assert!(parse_path("../../title").is_err());
        assert!(parse_path("../").is_err());
        assert!(parse_path("a..b").is_err());
        assert!(parse_path("@index").is_err());
        assert!(parse_path("a.").is_err());
    }
}
