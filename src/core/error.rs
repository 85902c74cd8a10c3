//! SC-011: Error types.

use super::cookbook::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// Loading or validating a cookbook failed.
#[derive(Debug, Error)]
pub enum CookbookError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml_ng::Error),
    #[error("{} validation error(s)", .0.len())]
    Invalid(Vec<ValidationError>),
}

/// The only engine failure that is reported rather than ignored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("recipe not found: {0}")]
    RecipeNotFound(String),
    #[error("recipe '{0}' has no steps")]
    EmptyRecipe(String),
}

/// Loading an input script failed.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("script parse error: {0}")]
    Parse(#[from] serde_yaml_ng::Error),
}

/// Writing or reading a notification transcript failed.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("transcript io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("transcript JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
