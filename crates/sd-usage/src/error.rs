use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Failed to read usage file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write usage file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Corrupt usage file {path} at line {line} ({reason}): {text}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        text: String,
        reason: String,
    },
    #[error("Usage entry \"{key}\" is already {state}.")]
    Conflict { key: String, state: &'static str },
    #[error("Usage entry \"{key}\" has no id because it was never included.")]
    MissingId { key: String },
    #[error("Usage entry \"{key}\" cannot get an id: every id of its definition is taken.")]
    IdsExhausted { key: String },
}

impl UsageError {
    /// Stable upper-snake code, matching the schema error codes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "USAGE_READ",
            Self::Write { .. } => "USAGE_WRITE",
            Self::Corrupt { .. } => "USAGE_CORRUPT",
            Self::Conflict { .. } => "USAGE_CONFLICT",
            Self::MissingId { .. } => "USAGE_MISSING_ID",
            Self::IdsExhausted { .. } => "USAGE_IDS_EXHAUSTED",
        }
    }
}
