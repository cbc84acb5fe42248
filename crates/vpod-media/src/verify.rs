//! Post-render output verification.
//!
//! The supervisor can only see ffmpeg's own progress claims; this module
//! checks the artifact itself after the process exits cleanly.

use std::path::Path;

use tracing::info;

use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_video, VideoInfo};

/// What a produced file must satisfy.
#[derive(Debug, Clone)]
pub struct VerifySpec {
    /// Floor on file size in bytes.
    pub min_bytes: u64,
    /// Floor on probed duration, seconds.
    pub min_duration_sec: f64,
    /// When set, probed duration must match within [`duration_tolerance`].
    pub expected_total_sec: Option<f64>,
}

impl VerifySpec {
    /// Checks for an intermediate clip of the given duration.
    pub fn clip(dur_sec: f64) -> Self {
        Self {
            min_bytes: 50 * 1024,
            min_duration_sec: (dur_sec * 0.5).max(0.5),
            expected_total_sec: None,
        }
    }

    /// Checks for the final episode render.
    pub fn final_render(expected_total_sec: f64) -> Self {
        Self {
            min_bytes: 500 * 1024,
            min_duration_sec: 5.0,
            expected_total_sec: Some(expected_total_sec),
        }
    }
}

/// Allowed deviation between probed and expected duration. Two frames
/// plus probe rounding, but never tighter than a quarter second.
pub fn duration_tolerance(fps: f64) -> f64 {
    (2.0 / fps.max(1.0) + 0.05).max(0.25)
}

/// Verify a rendered file against a [`VerifySpec`]. Returns the probe result so
/// callers can record it.
pub async fn verify_output(path: impl AsRef<Path>, spec: &VerifySpec) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::verification(format!(
            "no output produced: {}",
            path.display()
        )));
    }
    let bytes = tokio::fs::metadata(path).await?.len();
    if bytes < spec.min_bytes {
        return Err(MediaError::verification(format!(
            "output too small: {} ({} bytes, floor {})",
            path.display(),
            bytes,
            spec.min_bytes
        )));
    }

    let probed = probe_video(path).await.map_err(|e| {
        MediaError::verification(format!("output is not probeable: {} ({})", path.display(), e))
    })?;

    info!(
        file = %path.display(),
        dur_sec = format!("{:.3}", probed.duration),
        bytes,
        "verified output"
    );

    if probed.duration < spec.min_duration_sec {
        return Err(MediaError::verification(format!(
            "output duration too short: {:.3}s (floor {:.3}s)",
            probed.duration, spec.min_duration_sec
        )));
    }

    if let Some(expected) = spec.expected_total_sec {
        let tol = duration_tolerance(probed.fps);
        if (probed.duration - expected).abs() > tol {
            return Err(MediaError::verification(format!(
                "output duration {:.3}s does not match expected {:.3}s (tol {:.3}s)",
                probed.duration, expected, tol
            )));
        }
    }

    Ok(probed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_tolerance_floor() {
        // At 30fps two frames is under a quarter second.
        assert!((duration_tolerance(30.0) - 0.25).abs() < 1e-9);
        // At very low fps the frame term dominates.
        assert!((duration_tolerance(5.0) - 0.45).abs() < 1e-9);
        assert!((duration_tolerance(0.0) - 2.05).abs() < 1e-9);
    }

    #[test]
    fn test_clip_spec_scales_floor_with_duration() {
        let s = VerifySpec::clip(15.0);
        assert!((s.min_duration_sec - 7.5).abs() < 1e-9);
        let s = VerifySpec::clip(0.4);
        assert!((s.min_duration_sec - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_output_fails() {
        let spec = VerifySpec::final_render(60.0);
        let err = verify_output("/nonexistent/out.mp4", &spec).await.unwrap_err();
        assert!(matches!(err, MediaError::VerificationFailed(_)));
    }

    #[tokio::test]
    async fn test_too_small_output_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let p = dir.path().join("out.mp4");
        tokio::fs::write(&p, b"tiny").await.unwrap();
        let err = verify_output(&p, &VerifySpec::final_render(60.0))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::VerificationFailed(_)));
    }
}
