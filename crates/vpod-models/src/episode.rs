//! Episode records from the external registry.

use serde::{Deserialize, Serialize};

use crate::utils::strip_html;

/// One podcast episode, as read from the registry's `episodes.json`.
///
/// Episodes are immutable inputs here; the registry owns their lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Stable identity used for working directories, caching, and RNG seeding.
    pub guid: String,
    /// Owning podcast identifier (informational only).
    #[serde(default)]
    pub podcast_id: String,
    pub title: String,
    /// Plain-text description (HTML already stripped).
    pub description: String,
    /// Publication date in RFC 2822 form, as the feed carries it.
    #[serde(default)]
    pub pub_date: String,
    pub audio_url: String,
}

/// Raw registry entry shape. Descriptions arrive as HTML.
#[derive(Debug, Deserialize)]
struct RawEpisode {
    #[serde(default)]
    guid: String,
    #[serde(default)]
    podcast_id: String,
    #[serde(default)]
    title: String,
    #[serde(default, rename = "description_html")]
    description_html: String,
    #[serde(default, rename = "pubDate_rfc822")]
    pub_date: String,
    #[serde(default)]
    audio_url: String,
}

#[derive(Debug, Deserialize)]
struct RawRegistry {
    episodes: std::collections::BTreeMap<String, RawEpisode>,
}

/// Parse the registry's `episodes.json` payload.
///
/// Entries without a guid or audio URL are skipped. Missing titles fall
/// back to the guid, missing descriptions to the title. Output is sorted
/// by publication date (unparseable dates sort first).
pub fn parse_episodes(json: &str) -> Result<Vec<Episode>, serde_json::Error> {
    let raw: RawRegistry = serde_json::from_str(json)?;
    let mut out: Vec<Episode> = Vec::new();
    for (_, v) in raw.episodes {
        let guid = v.guid.trim().to_string();
        let audio_url = v.audio_url.trim().to_string();
        if guid.is_empty() || audio_url.is_empty() {
            continue;
        }
        let mut title = v.title.trim().to_string();
        if title.is_empty() {
            title = guid.clone();
        }
        let mut description = strip_html(&v.description_html);
        if description.is_empty() {
            description = title.clone();
        }
        out.push(Episode {
            guid,
            podcast_id: v.podcast_id.trim().to_string(),
            title,
            description,
            pub_date: v.pub_date.trim().to_string(),
            audio_url,
        });
    }
    out.sort_by_key(|e| {
        chrono::DateTime::parse_from_rfc2822(&e.pub_date)
            .map(|d| d.timestamp())
            .unwrap_or(0)
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_episodes_fills_defaults() {
        let json = r#"{
            "episodes": {
                "a": {
                    "guid": "ep-1",
                    "description_html": "<p>Hello <b>world</b></p>",
                    "pubDate_rfc822": "Mon, 02 Jun 2025 10:00:00 +0000",
                    "audio_url": "https://example.com/a.mp3"
                },
                "b": {
                    "guid": "",
                    "audio_url": "https://example.com/b.mp3"
                }
            }
        }"#;
        let eps = parse_episodes(json).unwrap();
        assert_eq!(eps.len(), 1);
        assert_eq!(eps[0].title, "ep-1");
        assert_eq!(eps[0].description, "Hello world");
    }

    #[test]
    fn test_parse_episodes_sorted_by_pub_date() {
        let json = r#"{
            "episodes": {
                "a": {
                    "guid": "newer",
                    "title": "Newer",
                    "pubDate_rfc822": "Tue, 03 Jun 2025 10:00:00 +0000",
                    "audio_url": "https://example.com/a.mp3"
                },
                "b": {
                    "guid": "older",
                    "title": "Older",
                    "pubDate_rfc822": "Sun, 01 Jun 2025 10:00:00 +0000",
                    "audio_url": "https://example.com/b.mp3"
                }
            }
        }"#;
        let eps = parse_episodes(json).unwrap();
        assert_eq!(eps[0].guid, "older");
        assert_eq!(eps[1].guid, "newer");
    }
}
