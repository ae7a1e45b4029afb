use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Template syntax error in block type '{block_type}' at line {line}, column {column}: {message}")]
    TemplateSyntax {
        block_type: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Unknown block type '{block_type}'")]
    UnknownBlockType { block_type: String },

    #[error("Error rendering block type '{block_type}': {message}")]
    BlockRender { block_type: String, message: String },

    #[error("Invalid block type '{name}': {reason}")]
    InvalidBlockType { name: String, reason: String },

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl RenderError {
    /// Attach the owning block type to errors raised before it was known.
    ///
    /// Templates are compiled and executed without knowing which block type
    /// they belong to; the registry and the page renderer fill it in.
    pub fn with_block_type(self, name: &str) -> Self {
        match self {
            RenderError::TemplateSyntax {
                line,
                column,
                message,
                ..
            } => RenderError::TemplateSyntax {
                block_type: name.to_string(),
                line,
                column,
                message,
            },
            RenderError::BlockRender { message, .. } => RenderError::BlockRender {
                block_type: name.to_string(),
                message,
            },
            other => other,
        }
    }

    /// Name of the block type this error refers to, if any.
    pub fn block_type(&self) -> Option<&str> {
        match self {
            RenderError::TemplateSyntax { block_type, .. }
            | RenderError::UnknownBlockType { block_type }
            | RenderError::BlockRender { block_type, .. } => Some(block_type),
            RenderError::InvalidBlockType { name, .. } => Some(name),
            RenderError::Deserialization(_) => None,
        }
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Deserialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for RenderError {
    fn from(err: serde_yaml::Error) -> Self {
        RenderError::Deserialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_block_type_fills_syntax_error() {
        let err = RenderError::TemplateSyntax {
            block_type: String::new(),
            line: 2,
            column: 5,
            message: "unclosed {{#if}}".to_string(),
        }
        .with_block_type("hero");

        assert_eq!(err.block_type(), Some("hero"));
        assert_eq!(
            err.to_string(),
            "Template syntax error in block type 'hero' at line 2, column 5: unclosed {{#if}}"
        );
    }

    #[test]
    fn test_with_block_type_leaves_other_errors() {
        let err = RenderError::UnknownBlockType {
            block_type: "gallery".to_string(),
        }
        .with_block_type("hero");
        assert_eq!(err.block_type(), Some("gallery"));
    }
}
