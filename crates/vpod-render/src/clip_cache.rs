//! Cached clip library.
//!
//! The alternative to exact-duration assembly: a fixed count of
//! fifteen-second normalized clips cut from random windows, ordered with
//! generic filler sprinkled evenly among topical clips, then packed into
//! a zip next to a metadata JSON so later runs can reuse the set.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use vpod_models::{Asset, ClipProvenance, EpisodeRng, QueryItem, Tier};
use vpod_models::manifest::ClipMode;

use crate::assembler::{ClipResolver, MIN_ASSET_SEC};
use crate::error::{RenderError, RenderResult};
use crate::hash::sha256_file;

/// Library clip length, seconds.
pub const CLIP_SEC: f64 = 15.0;

/// Each candidate may be revisited this many times while cutting clips.
const MAX_PICK_FACTOR: usize = 3;

/// Metadata stored alongside the clips inside the archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipMeta {
    pub guid: String,
    pub generated_at: String,
    pub clip_sec: f64,
    pub clips_count: usize,
    pub query_plan: Vec<QueryItem>,
    pub provenance: Vec<ClipProvenance>,
    pub generic_positions: Vec<usize>,
}

/// A generated clip library on disk.
#[derive(Debug, Clone)]
pub struct ClipLibrary {
    pub clips_dir: PathBuf,
    pub meta_path: PathBuf,
    pub zip_path: PathBuf,
    pub zip_asset_name: String,
    pub zip_sha256: String,
}

/// Spread `n_generic` positions evenly over `n_total` slots.
///
/// One pick per bucket, nudged to avoid collisions, then a second pass
/// breaks up directly adjacent picks where room allows.
pub fn sprinkle_positions(n_total: usize, n_generic: usize, rng: &mut EpisodeRng) -> Vec<usize> {
    if n_total == 0 || n_generic == 0 {
        return Vec::new();
    }
    if n_generic >= n_total {
        return (0..n_total).collect();
    }

    let bucket = n_total as f64 / n_generic as f64;
    let mut picks: Vec<usize> = Vec::with_capacity(n_generic);
    let mut used = vec![false; n_total];
    for i in 0..n_generic {
        let lo = ((i as f64 * bucket).round() as usize).min(n_total - 1);
        let hi = (((i + 1) as f64 * bucket).round() as isize - 1)
            .clamp(lo as isize, n_total as isize - 1) as usize;

        let mut cand = rng.pick_in_range(lo, hi);
        if used[cand] {
            for d in 1..n_total {
                if cand + d < n_total && !used[cand + d] {
                    cand += d;
                    break;
                }
                if cand >= d && !used[cand - d] {
                    cand -= d;
                    break;
                }
            }
        }
        used[cand] = true;
        picks.push(cand);
    }

    picks.sort_unstable();
    let mut adjusted: Vec<usize> = Vec::with_capacity(picks.len());
    let mut used2 = vec![false; n_total];
    for p in picks {
        let mut cand = p;
        if let Some(&prev) = adjusted.last() {
            if cand == prev + 1 {
                if cand + 1 < n_total && !used2[cand + 1] {
                    cand += 1;
                } else if cand >= 1 && !used2[cand - 1] {
                    cand -= 1;
                }
            }
        }
        // The nudge (or an earlier pick) may have taken this slot; walk
        // to the nearest free one so every position stays unique.
        if used2[cand] {
            for d in 1..n_total {
                if cand + d < n_total && !used2[cand + d] {
                    cand += d;
                    break;
                }
                if cand >= d && !used2[cand - d] {
                    cand -= d;
                    break;
                }
            }
        }
        used2[cand] = true;
        adjusted.push(cand);
    }
    adjusted.sort_unstable();
    adjusted
}

/// Cut up to `limit` clips from `assets`, cycling through the pool.
async fn make_from_assets(
    work: &Path,
    raw_dir: &Path,
    assets: &[&Asset],
    rng: &mut EpisodeRng,
    limit: usize,
    clip_prefix: &str,
    resolver: &dyn ClipResolver,
) -> RenderResult<Vec<(PathBuf, ClipProvenance)>> {
    let mut made: Vec<(PathBuf, ClipProvenance)> = Vec::new();
    if assets.is_empty() || limit == 0 {
        return Ok(made);
    }
    let mut pick_i = 0usize;
    let mut clip_i = 0usize;
    while made.len() < limit && pick_i < assets.len() * MAX_PICK_FACTOR {
        let asset = assets[pick_i % assets.len()];
        pick_i += 1;

        let resolved = match resolver.resolve(asset, raw_dir).await {
            Ok(r) => r,
            Err(e) => {
                debug!(asset = %asset.cache_file_name(), error = %e, "asset skipped");
                continue;
            }
        };
        if resolved.duration_sec < MIN_ASSET_SEC {
            continue;
        }
        let max_start = (resolved.duration_sec - CLIP_SEC).max(0.0);
        let start = rng.uniform(max_start);
        let tmp_clip = work.join(format!("{}_{:04}.mp4", clip_prefix, clip_i));
        if let Err(e) = vpod_media::make_clip(&resolved.path, &tmp_clip, start, CLIP_SEC).await {
            debug!(asset = %asset.cache_file_name(), error = %e, "clip extraction failed");
            continue;
        }
        made.push((
            tmp_clip,
            ClipProvenance {
                clip_index: clip_i,
                clip_name: String::new(),
                tier: asset.tier,
                mode: ClipMode::Full,
                source: asset.source,
                asset_id: asset.asset_id.clone(),
                author: asset.author.clone(),
                page_url: asset.page_url.clone(),
                download_url: asset.download_url.clone(),
                license_url: asset.license_url.clone(),
                query: asset.query.clone(),
                start_sec: start,
                duration_sec: CLIP_SEC,
                file_duration_sec: resolved.duration_sec,
                repeat_of: None,
            },
        ));
        clip_i += 1;
    }
    Ok(made)
}

fn zip_clips(clips_dir: &Path, meta_path: &Path, zip_path: &Path) -> RenderResult<()> {
    use std::io::Write;

    if let Some(parent) = zip_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(zip_path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut entries: Vec<PathBuf> = std::fs::read_dir(clips_dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension().map(|x| x == "mp4").unwrap_or(false)
                && p.file_name()
                    .map(|n| n.to_string_lossy().starts_with("clip_"))
                    .unwrap_or(false)
        })
        .collect();
    entries.sort();

    for path in entries {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        zip.start_file(name, options)?;
        let bytes = std::fs::read(&path)?;
        zip.write_all(&bytes)?;
    }
    let meta_name = meta_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    zip.start_file(meta_name, options)?;
    zip.write_all(&std::fs::read(meta_path)?)?;
    zip.finish()?;
    Ok(())
}

/// Build the ordered clip library for an episode.
///
/// Topical clips come from Tier-1/2 assets, filler from Tier-3; filler
/// positions are sprinkled evenly. The whole set is regenerated every
/// run so ordering always reflects the current plan.
pub async fn build_clip_library(
    guid: &str,
    queries: &[QueryItem],
    assets: &[Asset],
    need: usize,
    rng: &mut EpisodeRng,
    work_dir: &Path,
    resolver: &dyn ClipResolver,
) -> RenderResult<ClipLibrary> {
    if need == 0 {
        return Err(RenderError::assembly("clip count must be positive"));
    }
    let work = work_dir.join(guid);
    let raw_dir = work.join("raw");
    let clips_dir = work.join("clips_ordered");
    tokio::fs::create_dir_all(&raw_dir).await?;

    let mut main_assets: Vec<&Asset> = assets.iter().filter(|a| a.tier != Tier::Generic).collect();
    let mut generic_assets: Vec<&Asset> =
        assets.iter().filter(|a| a.tier == Tier::Generic).collect();
    rng.shuffle(&mut main_assets);
    rng.shuffle(&mut generic_assets);

    let mut clips_main =
        make_from_assets(&work, &raw_dir, &main_assets, rng, need, "main", resolver).await?;
    if clips_main.is_empty() {
        return Err(RenderError::insufficient("no usable clips produced"));
    }

    let generic_needed = need.saturating_sub(clips_main.len());
    let mut clips_generic = make_from_assets(
        &work,
        &raw_dir,
        &generic_assets,
        rng,
        generic_needed,
        "gen",
        resolver,
    )
    .await?;
    if clips_main.len() + clips_generic.len() < need {
        return Err(RenderError::insufficient(format!(
            "need {} clips, produced {}",
            need,
            clips_main.len() + clips_generic.len()
        )));
    }

    let generic_positions = sprinkle_positions(need, generic_needed, rng);
    rng.shuffle(&mut clips_main);
    rng.shuffle(&mut clips_generic);

    let _ = tokio::fs::remove_dir_all(&clips_dir).await;
    tokio::fs::create_dir_all(&clips_dir).await?;

    let mut provenance: Vec<ClipProvenance> = Vec::with_capacity(need);
    let mut mi = 0usize;
    let mut gi = 0usize;
    for idx in 0..need {
        let (src, mut prov) = if generic_positions.contains(&idx) {
            let item = clips_generic[gi].clone();
            gi += 1;
            item
        } else {
            let item = clips_main[mi].clone();
            mi += 1;
            item
        };
        let name = format!("clip_{:04}.mp4", idx);
        tokio::fs::copy(&src, clips_dir.join(&name)).await?;
        prov.clip_index = idx;
        prov.clip_name = name;
        provenance.push(prov);
    }

    let meta = ClipMeta {
        guid: guid.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        clip_sec: CLIP_SEC,
        clips_count: need,
        query_plan: queries.to_vec(),
        provenance,
        generic_positions: generic_positions.clone(),
    };
    let meta_path = work.join("clips_meta.json");
    tokio::fs::write(&meta_path, serde_json::to_vec_pretty(&meta)?).await?;

    let zip_asset_name = format!("clips_{}.zip", guid);
    let zip_path = work.join(&zip_asset_name);
    zip_clips(&clips_dir, &meta_path, &zip_path)?;
    let zip_sha256 = sha256_file(&zip_path).await?;

    info!(
        guid,
        clips = need,
        generic = generic_needed,
        zip = %zip_path.display(),
        "clip library built"
    );

    Ok(ClipLibrary {
        clips_dir,
        meta_path,
        zip_path,
        zip_asset_name,
        zip_sha256,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprinkle_spreads_over_buckets() {
        let mut rng = EpisodeRng::from_seed(11);
        let picks = sprinkle_positions(10, 3, &mut rng);
        assert_eq!(picks.len(), 3);
        // Unique, sorted, in range.
        assert!(picks.windows(2).all(|w| w[0] < w[1]));
        assert!(picks.iter().all(|&p| p < 10));
        // One pick per rough third of the timeline.
        assert!(picks[0] <= 4);
        assert!(picks[2] >= 5);
    }

    #[test]
    fn test_sprinkle_degenerate_cases() {
        let mut rng = EpisodeRng::from_seed(1);
        assert!(sprinkle_positions(0, 3, &mut rng).is_empty());
        assert!(sprinkle_positions(5, 0, &mut rng).is_empty());
        assert_eq!(sprinkle_positions(4, 9, &mut rng), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_sprinkle_deterministic_per_seed() {
        let mut a = EpisodeRng::from_seed(42);
        let mut b = EpisodeRng::from_seed(42);
        assert_eq!(
            sprinkle_positions(20, 6, &mut a),
            sprinkle_positions(20, 6, &mut b)
        );
    }

    #[test]
    fn test_sprinkle_positions_always_unique() {
        // Dense layouts force the adjacency pass into occupied slots;
        // the result must still be exactly n_generic distinct positions,
        // or interleaved placement would run past its clip lists.
        for seed in 0..200 {
            let mut rng = EpisodeRng::from_seed(seed);
            let picks = sprinkle_positions(5, 3, &mut rng);
            assert_eq!(picks.len(), 3, "seed {}", seed);
            assert!(
                picks.windows(2).all(|w| w[0] < w[1]),
                "seed {} produced {:?}",
                seed,
                picks
            );
            assert!(picks.iter().all(|&p| p < 5), "seed {}", seed);
        }
    }

    #[test]
    fn test_sprinkle_avoids_long_adjacent_runs() {
        for seed in 0..20 {
            let mut rng = EpisodeRng::from_seed(seed);
            let picks = sprinkle_positions(30, 6, &mut rng);
            assert_eq!(picks.len(), 6);
            let unique: std::collections::BTreeSet<_> = picks.iter().collect();
            assert_eq!(unique.len(), picks.len());
        }
    }
}
