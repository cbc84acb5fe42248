//! Content hashing for manifest and archive bookkeeping.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use crate::error::RenderResult;

/// Hex SHA-256 of a file, streamed in chunks.
pub async fn sha256_file(path: impl AsRef<Path>) -> RenderResult<String> {
    let mut file = tokio::fs::File::open(path.as_ref()).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
