//! Asset search across both providers.
//!
//! Provider failures never abort a sweep: each `(query, provider)` call
//! is recorded as an inspectable outcome and a failed call simply
//! contributes no assets.

use std::time::Duration;

use tracing::{info, warn};
use vpod_models::{Asset, AssetSource, QueryItem};

use crate::error::SourceError;
use crate::providers::ProviderClients;

/// Pause between provider calls to respect rate limits.
const PROVIDER_CALL_DELAY: Duration = Duration::from_millis(200);

const PEXELS_PER_PAGE: u32 = 10;
const PIXABAY_PER_PAGE: u32 = 15;

/// Result of one provider call during a sweep.
#[derive(Debug)]
pub struct ProviderOutcome {
    pub query: String,
    pub provider: AssetSource,
    /// Number of assets contributed, or the failure.
    pub result: Result<usize, SourceError>,
}

/// Everything a search sweep produced.
#[derive(Debug)]
pub struct SearchReport {
    /// Deduplicated assets sorted by `(tier, source, asset_id)`.
    pub assets: Vec<Asset>,
    /// Per-call outcomes, in call order.
    pub outcomes: Vec<ProviderOutcome>,
}

impl SearchReport {
    /// Calls that failed, for diagnostics.
    pub fn failures(&self) -> impl Iterator<Item = &ProviderOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

/// Deduplicate by `(source, asset_id)`, keeping the entry with the
/// lowest tier in its original position.
pub fn dedupe_assets(assets: Vec<Asset>) -> Vec<Asset> {
    let mut out: Vec<Asset> = Vec::with_capacity(assets.len());
    for a in assets {
        match out.iter_mut().find(|b| b.key() == a.key()) {
            Some(existing) => {
                if a.tier < existing.tier {
                    *existing = a;
                }
            }
            None => out.push(a),
        }
    }
    out
}

fn sort_canonical(assets: &mut [Asset]) {
    assets.sort_by(|a, b| {
        (a.tier, a.source, &a.asset_id).cmp(&(b.tier, b.source, &b.asset_id))
    });
}

async fn call_provider(
    clients: &ProviderClients,
    provider: AssetSource,
    item: &QueryItem,
    page: u32,
    assets: &mut Vec<Asset>,
    outcomes: &mut Vec<ProviderOutcome>,
) {
    tokio::time::sleep(PROVIDER_CALL_DELAY).await;
    let result = match provider {
        AssetSource::Pexels => {
            clients
                .pexels
                .search(&item.query, PEXELS_PER_PAGE, page)
                .await
        }
        AssetSource::Pixabay => {
            clients
                .pixabay
                .search(&item.query, PIXABAY_PER_PAGE, page)
                .await
        }
    };
    let result = match result {
        Ok(found) => {
            let n = found.len();
            for mut a in found {
                a.tier = item.tier;
                a.query = item.query.clone();
                assets.push(a);
            }
            Ok(n)
        }
        Err(e) => {
            warn!(
                provider = %provider,
                query = %item.query,
                error = %e,
                "provider search failed, continuing"
            );
            Err(e)
        }
    };
    outcomes.push(ProviderOutcome {
        query: item.query.clone(),
        provider,
        result,
    });
}

/// Search both providers for every query, one page each.
///
/// Returns deduplicated assets in canonical `(tier, source, asset_id)`
/// order plus the per-call outcomes.
pub async fn search_assets(clients: &ProviderClients, queries: &[QueryItem]) -> SearchReport {
    let mut assets: Vec<Asset> = Vec::new();
    let mut outcomes: Vec<ProviderOutcome> = Vec::new();

    for item in queries {
        if item.query.trim().is_empty() {
            continue;
        }
        call_provider(
            clients,
            AssetSource::Pexels,
            item,
            1,
            &mut assets,
            &mut outcomes,
        )
        .await;
        call_provider(
            clients,
            AssetSource::Pixabay,
            item,
            1,
            &mut assets,
            &mut outcomes,
        )
        .await;
    }

    let mut assets = dedupe_assets(assets);
    sort_canonical(&mut assets);
    info!(
        queries = queries.len(),
        assets = assets.len(),
        failures = outcomes.iter().filter(|o| o.result.is_err()).count(),
        "asset search complete"
    );
    SearchReport { assets, outcomes }
}

/// Fetch one page of assets for a single `(query, tier)`.
///
/// For callers that expand incrementally instead of sweeping everything
/// at once. Results are deduplicated and sorted by `(source, asset_id)`.
pub async fn search_assets_page(
    clients: &ProviderClients,
    item: &QueryItem,
    page: u32,
) -> SearchReport {
    let mut assets: Vec<Asset> = Vec::new();
    let mut outcomes: Vec<ProviderOutcome> = Vec::new();

    if !item.query.trim().is_empty() {
        call_provider(
            clients,
            AssetSource::Pexels,
            item,
            page,
            &mut assets,
            &mut outcomes,
        )
        .await;
        call_provider(
            clients,
            AssetSource::Pixabay,
            item,
            page,
            &mut assets,
            &mut outcomes,
        )
        .await;
    }

    let mut assets = dedupe_assets(assets);
    assets.sort_by(|a, b| (a.source, &a.asset_id).cmp(&(b.source, &b.asset_id)));
    SearchReport { assets, outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpod_models::Tier;

    fn asset(source: AssetSource, id: &str, tier: Tier) -> Asset {
        Asset {
            source,
            asset_id: id.to_string(),
            author: String::new(),
            page_url: String::new(),
            download_url: String::new(),
            width: 1920,
            height: 1080,
            license_url: source.license_url().to_string(),
            tier,
            query: String::new(),
        }
    }

    #[test]
    fn test_dedupe_keeps_lower_tier() {
        let assets = vec![
            asset(AssetSource::Pexels, "1", Tier::Generic),
            asset(AssetSource::Pexels, "1", Tier::Title),
            asset(AssetSource::Pixabay, "1", Tier::Keyword),
        ];
        let out = dedupe_assets(assets);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].source, AssetSource::Pexels);
        assert_eq!(out[0].tier, Tier::Title);
    }

    #[test]
    fn test_dedupe_keeps_position_of_first_sighting() {
        let assets = vec![
            asset(AssetSource::Pixabay, "9", Tier::Keyword),
            asset(AssetSource::Pexels, "1", Tier::Generic),
            asset(AssetSource::Pexels, "1", Tier::Title),
        ];
        let out = dedupe_assets(assets);
        assert_eq!(out[0].key(), (AssetSource::Pixabay, "9".to_string()));
        assert_eq!(out[1].tier, Tier::Title);
    }

    #[test]
    fn test_canonical_sort() {
        let mut assets = vec![
            asset(AssetSource::Pixabay, "2", Tier::Keyword),
            asset(AssetSource::Pexels, "9", Tier::Title),
            asset(AssetSource::Pexels, "10", Tier::Title),
        ];
        sort_canonical(&mut assets);
        assert_eq!(assets[0].asset_id, "10");
        assert_eq!(assets[1].asset_id, "9");
        assert_eq!(assets[2].source, AssetSource::Pixabay);
    }
}
