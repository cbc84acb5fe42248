//! Render pipeline configuration.

use std::path::PathBuf;

use crate::error::{RenderError, RenderResult};

/// Everything an episode render needs from the environment, resolved up
/// front so failures surface before any network or encode work.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Pexels API key.
    pub pexels_key: String,
    /// Pixabay API key.
    pub pixabay_key: String,
    /// Bumper video used for both intro and outro.
    pub intro_outro_path: PathBuf,
    /// Frame art overlaid on the main body.
    pub frame_path: PathBuf,
    /// Scratch root; a per-episode subdirectory is created and removed.
    pub work_dir: PathBuf,
    /// Destination for rendered videos.
    pub out_videos_dir: PathBuf,
    /// Destination for render manifests.
    pub out_manifests_dir: PathBuf,
    /// Destination for cached clip archives.
    pub out_clips_dir: PathBuf,
    /// Optional location anchor prefixed to every search query.
    pub search_prefix: String,
    /// Cap on planned search queries per episode.
    pub max_queries: usize,
    /// Add `-movflags +faststart` to the final encode.
    pub faststart: bool,
}

fn env_trimmed(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> bool {
    matches!(
        std::env::var(key).unwrap_or_default().trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl RenderContext {
    /// Create the context from environment variables.
    ///
    /// `PEXELS_API_KEY`, `PIXABAY_API_KEY`, `VP_INTRO_OUTRO`, and
    /// `VP_FRAME_PNG` are required; the rest have defaults.
    pub fn from_env() -> RenderResult<Self> {
        let pexels_key = env_trimmed("PEXELS_API_KEY")
            .ok_or_else(|| RenderError::config("PEXELS_API_KEY is not set"))?;
        let pixabay_key = env_trimmed("PIXABAY_API_KEY")
            .ok_or_else(|| RenderError::config("PIXABAY_API_KEY is not set"))?;
        let intro_outro_path = env_trimmed("VP_INTRO_OUTRO")
            .map(PathBuf::from)
            .ok_or_else(|| RenderError::config("VP_INTRO_OUTRO is not set"))?;
        let frame_path = env_trimmed("VP_FRAME_PNG")
            .map(PathBuf::from)
            .ok_or_else(|| RenderError::config("VP_FRAME_PNG is not set"))?;

        let out_root = env_trimmed("VP_OUT_DIR").unwrap_or_else(|| "out".to_string());
        let out_root = PathBuf::from(out_root);

        Ok(Self {
            pexels_key,
            pixabay_key,
            intro_outro_path,
            frame_path,
            work_dir: env_trimmed("VP_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/tmp/vpod")),
            out_videos_dir: out_root.join("videos"),
            out_manifests_dir: out_root.join("manifests"),
            out_clips_dir: out_root.join("clips"),
            search_prefix: env_trimmed("VP_SEARCH_PREFIX").unwrap_or_default(),
            max_queries: env_trimmed("VP_MAX_QUERIES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(12),
            faststart: env_flag("VIDEO_FASTSTART"),
        })
    }
}
