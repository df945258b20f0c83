//! Crate-level errors for loading and accessing configuration trees.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a configuration tree or accessing its members.
///
/// Reference strings that fail to resolve are never errors; they stay in the
/// tree as literals.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a top-level JSON object in {0}")]
    NotAnObject(PathBuf),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("{name} not in {path}")]
    MissingMember { name: String, path: String },
}

/// Result type for configuration tree operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
