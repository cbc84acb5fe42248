//! Frame-art canvas normalization.
//!
//! The overlay art is pre-rendered onto a transparent 16:9 canvas once
//! per run so the filtergraph never has to stretch it or fight SAR
//! mismatches: the source is scaled by height with aspect preserved and
//! centered on transparency.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::graph::{TARGET_H, TARGET_W};

/// Produce a transparent `TARGET_W`x`TARGET_H` PNG with `src` centered.
///
/// Kept when `dst` already exists and is newer than `src`.
pub async fn ensure_frame_canvas(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if !src.exists() {
        return Err(MediaError::FileNotFound(src.to_path_buf()));
    }
    if let (Ok(dst_meta), Ok(src_meta)) =
        (tokio::fs::metadata(dst).await, tokio::fs::metadata(src).await)
    {
        if let (Ok(dst_m), Ok(src_m)) = (dst_meta.modified(), src_meta.modified()) {
            if dst_m >= src_m {
                debug!(dst = %dst.display(), "frame canvas up to date");
                return Ok(());
            }
        }
    }
    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    // Transparent pad background and explicit RGBA so alpha survives.
    let vf = format!(
        "scale=-1:{h}:flags=lanczos,format=rgba,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black@0.0,format=rgba",
        w = TARGET_W,
        h = TARGET_H
    );

    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(src)
        .args(["-vf", &vf, "-frames:v", "1"])
        .arg(dst)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfmpegFailed {
            code: output.status.code(),
            tail: String::from_utf8_lossy(&output.stderr)
                .lines()
                .rev()
                .take(20)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n"),
        });
    }

    info!(
        src = %src.display(),
        dst = %dst.display(),
        out = format!("{}x{}", TARGET_W, TARGET_H),
        "frame canvas rendered"
    );
    Ok(())
}
