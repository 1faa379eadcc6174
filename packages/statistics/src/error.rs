//! Error types for the statistics collector.

use thiserror::Error;

/// Errors raised while collecting scene statistics.
#[derive(Error, Debug)]
pub enum StatsError {
    /// A scene could not be loaded or its hierarchy could not be built.
    #[error(transparent)]
    Export(#[from] scenetree_exporter::ExportError),

    /// Filesystem error while scanning or writing.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Summary serialisation failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The scan root contained no scene description files.
    #[error("no scene description files found under: {0}")]
    NoScenes(String),
}

/// Result alias for statistics operations.
pub type Result<T> = std::result::Result<T, StatsError>;
