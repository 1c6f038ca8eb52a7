use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy for the matching engine.
///
/// `Config` is raised before any index work begins; the remaining variants
/// carry the path or id needed to reproduce the failure.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt index file {path}: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("vector dimension mismatch: index dim {expected}, query dim {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("no embedding available for {what}")]
    EmbeddingUnavailable { what: String },
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io { path: path.into(), source }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        EngineError::CorruptIndex { path: path.into(), reason: reason.into() }
    }
}
