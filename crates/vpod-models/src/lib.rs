//! Shared data models for the podcast video renderer.
//!
//! This crate provides Serde-serializable types for:
//! - Episodes read from the external registry
//! - Tiered search queries and the sensitive-query policy record
//! - Stock-video assets and their identity keys
//! - Render segments and the absolute-timeline segment plan
//! - The per-episode render manifest
//! - A deterministic per-episode random generator

pub mod asset;
pub mod episode;
pub mod manifest;
pub mod query;
pub mod rng;
pub mod segment;
pub mod timecode;
pub mod utils;

// Re-export common types
pub use asset::{Asset, AssetKey, AssetSource};
pub use episode::{parse_episodes, Episode};
pub use manifest::{
    ClipMode, ClipProvenance, DurationLogEntry, LicenseNotes, Manifest, TimelineEntry, TrimRecord,
};
pub use query::{QueryItem, QueryPolicy, Tier};
pub use rng::EpisodeRng;
pub use segment::{PlanEntry, Segment, SegmentKind, SegmentPlan};
pub use timecode::format_seconds;
pub use utils::{normalize_spaces, safe_slug, strip_html};
