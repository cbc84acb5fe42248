//! Per-episode render manifest.
//!
//! The manifest is the system's audit trail: created once a render
//! succeeds, never mutated afterward. A fresh render replaces it whole.

use serde::{Deserialize, Serialize};

use crate::asset::AssetSource;
use crate::query::{QueryPolicy, Tier};

/// How a clip entered the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipMode {
    /// Whole downloaded source used as-is.
    Full,
    /// Repetition of an earlier segment after the pool was exhausted.
    Repeat,
}

/// Source attribution for one timeline clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipProvenance {
    pub clip_index: usize,
    pub clip_name: String,
    pub tier: Tier,
    pub mode: ClipMode,
    pub source: AssetSource,
    pub asset_id: String,
    pub author: String,
    pub page_url: String,
    pub download_url: String,
    pub license_url: String,
    pub query: String,
    pub start_sec: f64,
    pub duration_sec: f64,
    pub file_duration_sec: f64,
    /// Name of the original clip when `mode` is `Repeat`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_of: Option<String>,
}

/// Planned duration bookkeeping for one clip, kept for log replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationLogEntry {
    pub clip_index: usize,
    pub clip_name: String,
    pub path: String,
    pub file_duration_sec: f64,
    pub start_sec: f64,
    pub planned_duration_sec: f64,
    pub tier: Tier,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_of: Option<String>,
}

/// Final-segment trim applied to hit the audio duration exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimRecord {
    pub clip_index: usize,
    pub clip_name: String,
    pub trim_sec: f64,
    pub new_duration_sec: f64,
}

/// Absolute-timeline provenance row, one per main segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub file: String,
    pub source: AssetSource,
    pub asset_id: String,
    pub page_url: String,
    pub page_url_timecoded: String,
    pub src_start_sec: f64,
    pub src_end_sec: f64,
    pub src_dur_sec: f64,
    pub out_abs_start_sec: f64,
    pub out_abs_end_sec: f64,
}

/// License terms pages for the providers that contributed clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseNotes {
    pub pexels: String,
    pub pixabay: String,
}

impl Default for LicenseNotes {
    fn default() -> Self {
        Self {
            pexels: AssetSource::Pexels.license_url().to_string(),
            pixabay: AssetSource::Pixabay.license_url().to_string(),
        }
    }
}

/// Immutable record of one successful episode render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub guid: String,
    pub title: String,
    pub description: String,
    pub pub_date: String,
    pub audio_url: String,
    /// UTC timestamp of render completion, RFC 3339.
    pub rendered_at: String,
    pub video_asset_name: String,
    pub manifest_asset_name: String,
    pub render_mode: String,
    pub audio_sha256: String,
    pub video_sha256: String,
    pub audio_duration_sec: f64,
    pub intro_silence_sec: f64,
    pub outro_silence_sec: f64,
    pub expected_total_sec: f64,
    pub final_duration_sec: f64,
    pub segments_count: usize,
    pub duration_log: Vec<DurationLogEntry>,
    pub segments_timeline: Vec<TimelineEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trimmed_last: Option<TrimRecord>,
    /// Exact encoder invocation, space-joined.
    pub final_ffmpeg_cmd: String,
    pub query_policy: QueryPolicy,
    pub provenance: Vec<ClipProvenance>,
    pub license_notes: LicenseNotes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_serde_roundtrip() {
        let m = Manifest {
            guid: "g".into(),
            title: "t".into(),
            description: "d".into(),
            pub_date: String::new(),
            audio_url: "https://example.com/a.mp3".into(),
            rendered_at: "2025-06-01T00:00:00Z".into(),
            video_asset_name: "g_t.mp4".into(),
            manifest_asset_name: "g_t.json".into(),
            render_mode: "one_pass".into(),
            audio_sha256: "00".into(),
            video_sha256: "11".into(),
            audio_duration_sec: 47.25,
            intro_silence_sec: 5.0,
            outro_silence_sec: 5.0,
            expected_total_sec: 57.25,
            final_duration_sec: 57.25,
            segments_count: 2,
            duration_log: vec![],
            segments_timeline: vec![],
            trimmed_last: Some(TrimRecord {
                clip_index: 2,
                clip_name: "raw_0002.mp4".into(),
                trim_sec: 7.75,
                new_duration_sec: 17.25,
            }),
            final_ffmpeg_cmd: "ffmpeg -y".into(),
            query_policy: QueryPolicy::default(),
            provenance: vec![],
            license_notes: LicenseNotes::default(),
        };
        let json = serde_json::to_string_pretty(&m).unwrap();
        let back: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
