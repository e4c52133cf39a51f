use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    #[serde(default)]
    pub file: String,
    pub start: SourceLocation,
    pub end: SourceLocation,
}

impl SourceSpan {
    pub fn synthetic() -> Self {
        Self {
            file: String::new(),
            start: SourceLocation { line: 1, column: 1 },
            end: SourceLocation { line: 1, column: 1 },
        }
    }

    pub fn at(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            start: SourceLocation { line, column: 1 },
            end: SourceLocation { line, column: 1 },
        }
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        Self::synthetic()
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = if self.file.is_empty() {
            "<synthetic>"
        } else {
            self.file.as_str()
        };
        write!(f, "{}:{}:{}", file, self.start.line, self.start.column)
    }
}

#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn span_display_names_file_and_position() {
        assert_eq!(SourceSpan::at("things.sd", 12).to_string(), "things.sd:12:1");
        assert_eq!(SourceSpan::synthetic().to_string(), "<synthetic>:1:1");
    }
}
