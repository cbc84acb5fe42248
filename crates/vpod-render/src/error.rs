//! Render pipeline error types.

use thiserror::Error;

/// Result type for render pipeline operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors from episode assembly and orchestration.
///
/// `SourceAsset` marks per-asset trouble the assembler handles by
/// skipping the asset; everything else aborts the episode.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Source asset unusable: {0}")]
    SourceAsset(String),

    #[error("Insufficient assets: {0}")]
    InsufficientAssets(String),

    #[error("Assembly failed: {0}")]
    Assembly(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Search error: {0}")]
    Source(#[from] vpod_sources::SourceError),

    #[error("Media error: {0}")]
    Media(#[from] vpod_media::MediaError),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RenderError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn assembly(message: impl Into<String>) -> Self {
        Self::Assembly(message.into())
    }

    pub fn insufficient(message: impl Into<String>) -> Self {
        Self::InsufficientAssets(message.into())
    }

    pub fn source_asset(message: impl Into<String>) -> Self {
        Self::SourceAsset(message.into())
    }
}
