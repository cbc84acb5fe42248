//! Stock-video provider HTTP clients.
//!
//! Each provider returns several renditions per hit; the client keeps
//! the one with the largest pixel area and normalizes everything to an
//! [`Asset`]. Tier and query are stamped on by the caller.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;
use vpod_models::{Asset, AssetSource, Tier};

use crate::error::{SourceError, SourceResult};

const USER_AGENT: &str = "vpod-render/0.1";

/// Shared HTTP client construction.
fn http_client() -> SourceResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()?;
    Ok(client)
}

/// Pexels video search client (bearer-style `Authorization` header).
#[derive(Debug, Clone)]
pub struct PexelsClient {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct PexelsResponse {
    #[serde(default)]
    videos: Vec<PexelsVideo>,
}

#[derive(Debug, Deserialize)]
struct PexelsVideo {
    id: u64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    user: PexelsUser,
    #[serde(default)]
    video_files: Vec<PexelsFile>,
}

#[derive(Debug, Default, Deserialize)]
struct PexelsUser {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct PexelsFile {
    #[serde(default)]
    link: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

impl PexelsClient {
    pub fn new(api_key: impl Into<String>) -> SourceResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SourceError::MissingApiKey("pexels"));
        }
        Ok(Self {
            http: http_client()?,
            api_key,
        })
    }

    /// Search one page of videos for a query.
    pub async fn search(&self, query: &str, per_page: u32, page: u32) -> SourceResult<Vec<Asset>> {
        let url = format!(
            "https://api.pexels.com/videos/search?query={}&per_page={}&page={}",
            urlencoding::encode(query),
            per_page,
            page
        );
        debug!(provider = "pexels", query, page, "searching");
        let response = self
            .http
            .get(&url)
            .header("Authorization", &self.api_key)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::RequestFailed { status, body });
        }
        let parsed: PexelsResponse = response.json().await?;

        let mut out = Vec::new();
        for v in parsed.videos {
            let best = v
                .video_files
                .iter()
                .filter(|f| !f.link.is_empty() && f.width > 0 && f.height > 0)
                .max_by_key(|f| u64::from(f.width) * u64::from(f.height));
            let Some(best) = best else { continue };
            out.push(Asset {
                source: AssetSource::Pexels,
                asset_id: v.id.to_string(),
                author: v.user.name.clone(),
                page_url: v.url.clone(),
                download_url: best.link.clone(),
                width: best.width,
                height: best.height,
                license_url: AssetSource::Pexels.license_url().to_string(),
                tier: Tier::Generic,
                query: String::new(),
            });
        }
        Ok(out)
    }
}

/// Pixabay video search client (API key as a query parameter).
#[derive(Debug, Clone)]
pub struct PixabayClient {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct PixabayResponse {
    #[serde(default)]
    hits: Vec<PixabayHit>,
}

#[derive(Debug, Deserialize)]
struct PixabayHit {
    id: u64,
    #[serde(default)]
    user: String,
    #[serde(default, rename = "pageURL")]
    page_url: String,
    #[serde(default)]
    videos: PixabayRenditions,
}

#[derive(Debug, Default, Deserialize)]
struct PixabayRenditions {
    large: Option<PixabayRendition>,
    medium: Option<PixabayRendition>,
    small: Option<PixabayRendition>,
    tiny: Option<PixabayRendition>,
}

#[derive(Debug, Deserialize)]
struct PixabayRendition {
    #[serde(default)]
    url: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

impl PixabayClient {
    pub fn new(api_key: impl Into<String>) -> SourceResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SourceError::MissingApiKey("pixabay"));
        }
        Ok(Self {
            http: http_client()?,
            api_key,
        })
    }

    /// Search one page of videos for a query.
    pub async fn search(&self, query: &str, per_page: u32, page: u32) -> SourceResult<Vec<Asset>> {
        let url = format!(
            "https://pixabay.com/api/videos/?key={}&q={}&per_page={}&page={}",
            urlencoding::encode(&self.api_key),
            urlencoding::encode(query),
            per_page,
            page
        );
        debug!(provider = "pixabay", query, page, "searching");
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::RequestFailed { status, body });
        }
        let parsed: PixabayResponse = response.json().await?;

        let mut out = Vec::new();
        for h in parsed.hits {
            let renditions = [
                h.videos.large.as_ref(),
                h.videos.medium.as_ref(),
                h.videos.small.as_ref(),
                h.videos.tiny.as_ref(),
            ];
            let best = renditions
                .into_iter()
                .flatten()
                .filter(|r| !r.url.is_empty() && r.width > 0 && r.height > 0)
                .max_by_key(|r| u64::from(r.width) * u64::from(r.height));
            let Some(best) = best else { continue };
            out.push(Asset {
                source: AssetSource::Pixabay,
                asset_id: h.id.to_string(),
                author: h.user.clone(),
                page_url: h.page_url.clone(),
                download_url: best.url.clone(),
                width: best.width,
                height: best.height,
                license_url: AssetSource::Pixabay.license_url().to_string(),
                tier: Tier::Generic,
                query: String::new(),
            });
        }
        Ok(out)
    }
}

/// Both provider clients, built from the caller's API keys.
#[derive(Debug, Clone)]
pub struct ProviderClients {
    pub pexels: PexelsClient,
    pub pixabay: PixabayClient,
}

impl ProviderClients {
    pub fn new(pexels_key: impl Into<String>, pixabay_key: impl Into<String>) -> SourceResult<Self> {
        Ok(Self {
            pexels: PexelsClient::new(pexels_key)?,
            pixabay: PixabayClient::new(pixabay_key)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_rejected() {
        assert!(matches!(
            PexelsClient::new("  "),
            Err(SourceError::MissingApiKey("pexels"))
        ));
        assert!(matches!(
            PixabayClient::new(""),
            Err(SourceError::MissingApiKey("pixabay"))
        ));
    }

    #[test]
    fn test_pexels_largest_rendition_wins() {
        let json = r#"{
            "videos": [{
                "id": 42,
                "url": "https://www.pexels.com/video/42/",
                "user": {"name": "Ann"},
                "video_files": [
                    {"link": "https://cdn/a", "width": 640, "height": 360},
                    {"link": "https://cdn/b", "width": 1920, "height": 1080},
                    {"link": "", "width": 3840, "height": 2160}
                ]
            }]
        }"#;
        let parsed: PexelsResponse = serde_json::from_str(json).unwrap();
        let v = &parsed.videos[0];
        let best = v
            .video_files
            .iter()
            .filter(|f| !f.link.is_empty() && f.width > 0 && f.height > 0)
            .max_by_key(|f| u64::from(f.width) * u64::from(f.height))
            .unwrap();
        assert_eq!(best.link, "https://cdn/b");
    }

    #[test]
    fn test_pixabay_response_shape() {
        let json = r#"{
            "hits": [{
                "id": 7,
                "user": "Bob",
                "pageURL": "https://pixabay.com/videos/id-7/",
                "videos": {
                    "large": {"url": "https://cdn/l", "width": 1920, "height": 1080},
                    "tiny": {"url": "https://cdn/t", "width": 640, "height": 360}
                }
            }]
        }"#;
        let parsed: PixabayResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.hits[0].id, 7);
        assert!(parsed.hits[0].videos.medium.is_none());
    }
}
