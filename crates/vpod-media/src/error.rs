//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors from probing, graph building, downloads, and the encoder run.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg exited with {code:?}: {tail}")]
    FfmpegFailed { code: Option<i32>, tail: String },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("FFmpeg stalled: output time not advancing for {stalled_secs:.1}s at {out_time:.3}s")]
    Stalled { stalled_secs: f64, out_time: f64 },

    #[error("FFmpeg runaway duration: output at {out_time:.3}s exceeds expected {expected:.3}s")]
    Runaway { out_time: f64, expected: f64 },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Render graph invalid: {0}")]
    GraphBuild(String),

    #[error("Output verification failed: {0}")]
    VerificationFailed(String),

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    pub fn graph(message: impl Into<String>) -> Self {
        Self::GraphBuild(message.into())
    }

    pub fn verification(message: impl Into<String>) -> Self {
        Self::VerificationFailed(message.into())
    }

    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }
}
