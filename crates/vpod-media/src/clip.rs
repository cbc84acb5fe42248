//! Single-clip extraction for the cached clip library.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::graph::{TARGET_FPS, TARGET_H, TARGET_W};
use crate::verify::{verify_output, VerifySpec};

const CLIP_TIMEOUT: Duration = Duration::from_secs(900);

/// Cut a silent, normalized clip out of a source video.
///
/// The window is seeked before decode, so long sources stay cheap. The
/// result matches the render graph's per-segment normalization, which
/// keeps cached clips concat-compatible.
pub async fn make_clip(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    start_sec: f64,
    dur_sec: f64,
) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();
    if !src.exists() {
        return Err(MediaError::FileNotFound(src.to_path_buf()));
    }
    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let vf = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,\
         setsar=1,fps={fps}",
        w = TARGET_W,
        h = TARGET_H,
        fps = TARGET_FPS
    );

    debug!(
        src = %src.display(),
        dst = %dst.display(),
        start = format!("{:.3}", start_sec),
        dur = format!("{:.3}", dur_sec),
        "extracting clip"
    );

    let run = Command::new("ffmpeg")
        .arg("-y")
        .args(["-ss", &format!("{:.3}", start_sec)])
        .args(["-t", &format!("{:.3}", dur_sec)])
        .arg("-i")
        .arg(src)
        .args(["-vf", &vf])
        .arg("-an")
        .args(["-c:v", "libx264", "-preset", "veryfast", "-pix_fmt", "yuv420p"])
        .arg(dst)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    let output = tokio::time::timeout(CLIP_TIMEOUT, run)
        .await
        .map_err(|_| MediaError::Timeout(CLIP_TIMEOUT.as_secs()))??;

    if !output.status.success() {
        return Err(MediaError::FfmpegFailed {
            code: output.status.code(),
            tail: String::from_utf8_lossy(&output.stderr)
                .lines()
                .rev()
                .take(30)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n"),
        });
    }

    verify_output(dst, &VerifySpec::clip(dur_sec)).await?;
    Ok(())
}
