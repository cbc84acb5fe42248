//! Stock-video asset candidates returned by provider search.

use serde::{Deserialize, Serialize};

use crate::query::Tier;

/// Supported stock-video providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSource {
    Pexels,
    Pixabay,
}

impl AssetSource {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetSource::Pexels => "pexels",
            AssetSource::Pixabay => "pixabay",
        }
    }

    /// Provider license terms page, recorded per asset for auditability.
    pub fn license_url(self) -> &'static str {
        match self {
            AssetSource::Pexels => "https://www.pexels.com/license/",
            AssetSource::Pixabay => "https://pixabay.com/service/license/",
        }
    }

    /// Stable public page URL for an asset id, when the provider has one.
    pub fn page_url_for(self, asset_id: &str) -> String {
        match self {
            AssetSource::Pexels => format!("https://www.pexels.com/video/{}/", asset_id),
            AssetSource::Pixabay => format!("https://pixabay.com/videos/id-{}/", asset_id),
        }
    }
}

impl std::fmt::Display for AssetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity key of an asset across queries and providers.
pub type AssetKey = (AssetSource, String);

/// One downloadable stock-video candidate, normalized to the rendition
/// with the largest pixel area the provider offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub source: AssetSource,
    pub asset_id: String,
    pub author: String,
    pub page_url: String,
    pub download_url: String,
    pub width: u32,
    pub height: u32,
    pub license_url: String,
    /// Tier of the query that found this asset. When the same asset is
    /// found under several queries the lowest tier wins.
    pub tier: Tier,
    /// The query that found this asset.
    pub query: String,
}

impl Asset {
    /// Identity key: `(source, asset_id)`.
    pub fn key(&self) -> AssetKey {
        (self.source, self.asset_id.clone())
    }

    /// Local cache file name for the downloaded source, unique per key.
    pub fn cache_file_name(&self) -> String {
        format!("{}-{}.mp4", self.source, self.asset_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(source: AssetSource, id: &str) -> Asset {
        Asset {
            source,
            asset_id: id.to_string(),
            author: String::new(),
            page_url: String::new(),
            download_url: String::new(),
            width: 1920,
            height: 1080,
            license_url: source.license_url().to_string(),
            tier: Tier::Generic,
            query: String::new(),
        }
    }

    #[test]
    fn test_asset_key() {
        let a = asset(AssetSource::Pexels, "42");
        assert_eq!(a.key(), (AssetSource::Pexels, "42".to_string()));
        assert_eq!(a.cache_file_name(), "pexels-42.mp4");
    }

    #[test]
    fn test_page_url_inference() {
        assert_eq!(
            AssetSource::Pexels.page_url_for("34056946"),
            "https://www.pexels.com/video/34056946/"
        );
        assert_eq!(
            AssetSource::Pixabay.page_url_for("123"),
            "https://pixabay.com/videos/id-123/"
        );
    }
}
