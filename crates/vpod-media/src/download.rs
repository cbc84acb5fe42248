//! Streaming HTTP downloads for audio and source video files.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

const USER_AGENT: &str = "vpod-render/0.1";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(90);

/// Download `url` to `dst`, streaming to a sibling temp file and renaming
/// into place so partial downloads never masquerade as complete files.
pub async fn download(url: &str, dst: impl AsRef<Path>) -> MediaResult<u64> {
    let dst = dst.as_ref();
    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    debug!(url, dst = %dst.display(), "downloading");

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(DOWNLOAD_TIMEOUT)
        .build()?;
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(MediaError::download_failed(format!(
            "{} returned {}",
            url,
            response.status()
        )));
    }

    let tmp = dst.with_extension("part");
    let mut file = tokio::fs::File::create(&tmp).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    if written == 0 {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(MediaError::download_failed(format!("{} returned no data", url)));
    }

    tokio::fs::rename(&tmp, dst).await?;
    info!(dst = %dst.display(), bytes = written, "downloaded");
    Ok(written)
}

/// Download only when `dst` is missing or empty.
pub async fn download_if_missing(url: &str, dst: impl AsRef<Path>) -> MediaResult<u64> {
    let dst = dst.as_ref();
    if let Ok(meta) = tokio::fs::metadata(dst).await {
        if meta.len() > 0 {
            debug!(dst = %dst.display(), bytes = meta.len(), "cached, skipping download");
            return Ok(meta.len());
        }
    }
    download(url, dst).await
}
