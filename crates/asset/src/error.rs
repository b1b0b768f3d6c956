//! Import error taxonomy. `Parse` and `Integrity` abort an import;
//! `Decode` is reported per texture and the import continues.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    /// The asset file could not be parsed into a complete scene.
    #[error("failed to parse asset '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    /// A single texture file could not be read or decoded.
    #[error("failed to decode texture '{path}': {reason}")]
    Decode { path: PathBuf, reason: String },

    /// An internal invariant was violated. Always a bug in the pipeline
    /// or a collaborator breaking its contract, never tolerated silently.
    #[error("import integrity violated: {0}")]
    Integrity(String),
}

impl ImportError {
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type ImportResult<T> = Result<T, ImportError>;
