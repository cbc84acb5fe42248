//! Search query planning and stock-video provider clients.
//!
//! This crate turns an episode title/description into ranked search
//! phrases, applies the sensitive-query policy, and queries Pexels and
//! Pixabay for candidate clips, normalizing and deduplicating results.

pub mod error;
pub mod planner;
pub mod policy;
pub mod providers;
pub mod search;

pub use error::{SourceError, SourceResult};
pub use planner::{build_tiered_queries, text_queries};
pub use policy::apply_sensitive_query_policy;
pub use providers::{PexelsClient, PixabayClient, ProviderClients};
pub use search::{dedupe_assets, search_assets, search_assets_page, ProviderOutcome, SearchReport};
