//! Episode render pipeline.
//!
//! Ties the workspace together: query planning with the sensitive-term
//! policy, provider search, exact-duration assembly or the cached clip
//! library, the supervised one-pass encode, and manifest writing.

pub mod assembler;
pub mod clip_cache;
pub mod config;
pub mod error;
pub mod hash;
pub mod pipeline;
pub mod plan;

pub use assembler::{assemble_exact, Assembly, ClipResolver, HttpClipResolver, ResolvedClip};
pub use clip_cache::{build_clip_library, sprinkle_positions, ClipLibrary, ClipMeta, CLIP_SEC};
pub use config::RenderContext;
pub use error::{RenderError, RenderResult};
pub use pipeline::{build_episode_clip_library, render_episode, RenderedEpisode};
pub use plan::plan_queries;
