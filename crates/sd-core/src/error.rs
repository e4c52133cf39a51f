use crate::types::SourceSpan;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct SchemaError {
    pub code: String,
    pub message: String,
    pub span: Option<SourceSpan>,
    /// Names of every definition involved in the failure.
    pub related: Vec<String>,
}

impl SchemaError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            span: None,
            related: Vec::new(),
        }
    }

    pub fn with_span(
        code: impl Into<String>,
        message: impl Into<String>,
        span: SourceSpan,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            span: Some(span),
            related: Vec::new(),
        }
    }

    pub fn with_related<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.related.contains(&name) {
                self.related.push(name);
            }
        }
        self
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn display_includes_code_and_message() {
        let error = SchemaError::new("DEFINITION_UNKNOWN", "Unknown definition \"Foo\".");
        assert_eq!(error.to_string(), "DEFINITION_UNKNOWN: Unknown definition \"Foo\".");
        assert!(error.span.is_none());
    }

    #[test]
    fn with_related_deduplicates_names() {
        let error = SchemaError::new("MULTIPLE_BASE_ACTIONS", "two bases")
            .with_related(["A", "B"])
            .with_related(["B", "C"]);
        assert_eq!(error.related, vec!["A", "B", "C"]);
    }
}
