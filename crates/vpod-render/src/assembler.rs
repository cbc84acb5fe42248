//! Exact-duration segment assembly.
//!
//! Builds the main-body timeline for the one-pass render: whole Tier-1
//! sources are laid end to end until they cover the episode audio, the
//! pool is cycled with repeats if it runs dry, and the final segment is
//! trimmed so the planned total matches the audio duration to the
//! millisecond.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};
use vpod_models::{
    manifest::ClipMode, Asset, ClipProvenance, DurationLogEntry, EpisodeRng, Segment, Tier,
    TrimRecord,
};

use crate::error::{RenderError, RenderResult};

/// Sources shorter than this are rejected outright.
pub const MIN_ASSET_SEC: f64 = 16.0;

/// Each candidate may be revisited this many times before assembly
/// declares the pool exhausted.
const MAX_ATTEMPT_FACTOR: usize = 5;

/// Overshoot below this is treated as already exact.
const TRIM_EPSILON: f64 = 0.0005;

/// A trimmed final segment must keep at least this much.
const MIN_TRIMMED_TAIL_SEC: f64 = 0.1;

/// Allowed residual between planned total and audio duration.
const MATCH_TOLERANCE_SEC: f64 = 0.01;

/// A downloaded, probed source ready for the timeline.
#[derive(Debug, Clone)]
pub struct ResolvedClip {
    pub path: PathBuf,
    pub duration_sec: f64,
    pub width: u32,
    pub height: u32,
}

impl ResolvedClip {
    /// True for portrait-orientation sources, which are not usable.
    pub fn is_vertical(&self) -> bool {
        self.width > 0 && self.height > 0 && self.width < self.height
    }
}

/// Fetches an asset into the raw directory.
///
/// A trait seam so assembly order, rejection, repeats, and trim math can
/// be tested without network or ffmpeg.
#[async_trait]
pub trait ClipResolver: Send + Sync {
    async fn resolve(&self, asset: &Asset, raw_dir: &Path) -> RenderResult<ResolvedClip>;
}

/// Resolver that downloads via HTTP and probes with ffprobe.
#[derive(Debug, Default)]
pub struct HttpClipResolver;

#[async_trait]
impl ClipResolver for HttpClipResolver {
    async fn resolve(&self, asset: &Asset, raw_dir: &Path) -> RenderResult<ResolvedClip> {
        let path = raw_dir.join(asset.cache_file_name());
        vpod_media::download_if_missing(&asset.download_url, &path)
            .await
            .map_err(|e| RenderError::source_asset(format!("{}: {}", asset.cache_file_name(), e)))?;
        let info = vpod_media::probe_video(&path)
            .await
            .map_err(|e| RenderError::source_asset(format!("{}: {}", asset.cache_file_name(), e)))?;
        Ok(ResolvedClip {
            path,
            duration_sec: info.duration,
            width: info.width,
            height: info.height,
        })
    }
}

/// Output of one assembly pass.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub segments: Vec<Segment>,
    pub provenance: Vec<ClipProvenance>,
    pub duration_log: Vec<DurationLogEntry>,
    pub trimmed_last: Option<TrimRecord>,
}

fn clip_name(index: usize) -> String {
    format!("raw_{:04}.mp4", index)
}

/// Assemble segments covering `audio_dur_sec` exactly.
///
/// Only Tier-1 assets are eligible; their absence is fatal. Vertical and
/// too-short sources are skipped. When the pool cannot cover the audio,
/// existing segments repeat in order. The last segment is trimmed down so
/// the planned total equals the audio duration.
pub async fn assemble_exact(
    assets: &[Asset],
    audio_dur_sec: f64,
    raw_dir: &Path,
    rng: &mut EpisodeRng,
    resolver: &dyn ClipResolver,
) -> RenderResult<Assembly> {
    let mut picks: Vec<&Asset> = assets.iter().filter(|a| a.tier == Tier::Title).collect();
    if picks.is_empty() {
        return Err(RenderError::insufficient("no Tier-1 assets found"));
    }
    rng.shuffle(&mut picks);

    let mut out = Assembly::default();
    let mut d_sum = 0.0_f64;
    let mut clip_i = 1usize;
    let mut attempts = 0usize;
    let max_attempts = picks.len().max(1) * MAX_ATTEMPT_FACTOR;

    while d_sum < audio_dur_sec && attempts < max_attempts {
        let asset = picks[attempts % picks.len()];
        attempts += 1;

        let resolved = match resolver.resolve(asset, raw_dir).await {
            Ok(r) => r,
            Err(e) => {
                debug!(asset = %asset.cache_file_name(), error = %e, "asset skipped");
                continue;
            }
        };
        if resolved.is_vertical() {
            warn!(
                asset = %asset.cache_file_name(),
                w = resolved.width,
                h = resolved.height,
                "rejecting vertical asset"
            );
            let _ = tokio::fs::remove_file(&resolved.path).await;
            continue;
        }
        if resolved.duration_sec < MIN_ASSET_SEC {
            debug!(
                asset = %asset.cache_file_name(),
                dur = format!("{:.3}", resolved.duration_sec),
                "too short, skipping"
            );
            continue;
        }

        let name = clip_name(clip_i);
        let use_dur = resolved.duration_sec;
        info!(
            clip = %name,
            file_dur = format!("{:.3}", resolved.duration_sec),
            use_dur = format!("{:.3}", use_dur),
            tier = %asset.tier,
            "segment added"
        );
        out.duration_log.push(DurationLogEntry {
            clip_index: clip_i,
            clip_name: name.clone(),
            path: resolved.path.to_string_lossy().into_owned(),
            file_duration_sec: resolved.duration_sec,
            start_sec: 0.0,
            planned_duration_sec: use_dur,
            tier: asset.tier,
            query: asset.query.clone(),
            repeat_of: None,
        });
        out.segments.push(Segment::new(&resolved.path, 0.0, use_dur));
        out.provenance.push(ClipProvenance {
            clip_index: clip_i,
            clip_name: name,
            tier: asset.tier,
            mode: ClipMode::Full,
            source: asset.source,
            asset_id: asset.asset_id.clone(),
            author: asset.author.clone(),
            page_url: asset.page_url.clone(),
            download_url: asset.download_url.clone(),
            license_url: asset.license_url.clone(),
            query: asset.query.clone(),
            start_sec: 0.0,
            duration_sec: use_dur,
            file_duration_sec: resolved.duration_sec,
            repeat_of: None,
        });
        d_sum += use_dur;
        clip_i += 1;
    }

    if out.segments.is_empty() {
        return Err(RenderError::insufficient("no usable segments produced"));
    }

    // Cycle existing segments until the audio is covered.
    if d_sum < audio_dur_sec {
        info!(
            need_more = format!("{:.3}", audio_dur_sec - d_sum),
            "pool exhausted, repeating segments"
        );
        let pool_len = out.segments.len();
        let mut rep_i = 0usize;
        while d_sum < audio_dur_sec {
            let base_seg = out.segments[rep_i % pool_len].clone();
            let base_prov = out.provenance[rep_i % pool_len].clone();
            let name = clip_name(clip_i);
            debug!(clip = %name, from = %base_prov.clip_name, "repeat segment");
            out.duration_log.push(DurationLogEntry {
                clip_index: clip_i,
                clip_name: name.clone(),
                path: base_seg.path.to_string_lossy().into_owned(),
                file_duration_sec: base_prov.file_duration_sec,
                start_sec: base_seg.start_sec,
                planned_duration_sec: base_seg.dur_sec,
                tier: base_prov.tier,
                query: base_prov.query.clone(),
                repeat_of: Some(base_prov.clip_name.clone()),
            });
            d_sum += base_seg.dur_sec;
            out.provenance.push(ClipProvenance {
                clip_index: clip_i,
                clip_name: name,
                mode: ClipMode::Repeat,
                repeat_of: Some(base_prov.clip_name.clone()),
                ..base_prov
            });
            out.segments.push(base_seg);
            clip_i += 1;
            rep_i += 1;
        }
    }

    // Trim the tail so the planned total matches the audio exactly.
    let excess = d_sum - audio_dur_sec;
    if excess > TRIM_EPSILON {
        let last_idx = out.segments.len() - 1;
        let new_dur = out.segments[last_idx].dur_sec - excess;
        if new_dur < MIN_TRIMMED_TAIL_SEC {
            return Err(RenderError::assembly("last clip too short after trim"));
        }
        out.segments[last_idx].dur_sec = new_dur;
        out.provenance[last_idx].duration_sec = new_dur;
        let log = &out.duration_log[last_idx];
        out.trimmed_last = Some(TrimRecord {
            clip_index: log.clip_index,
            clip_name: log.clip_name.clone(),
            trim_sec: excess,
            new_duration_sec: new_dur,
        });
        d_sum = audio_dur_sec;
        info!(
            clip = %out.provenance[last_idx].clip_name,
            trim_sec = format!("{:.3}", excess),
            new_dur = format!("{:.3}", new_dur),
            "trimmed final segment"
        );
    }

    if (d_sum - audio_dur_sec).abs() > MATCH_TOLERANCE_SEC {
        return Err(RenderError::assembly(format!(
            "segments cover {:.3}s, audio is {:.3}s",
            d_sum, audio_dur_sec
        )));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vpod_models::AssetSource;

    struct FakeResolver {
        // asset_id -> (duration, width, height); missing ids fail.
        clips: HashMap<String, (f64, u32, u32)>,
    }

    impl FakeResolver {
        fn new(clips: &[(&str, f64, u32, u32)]) -> Self {
            Self {
                clips: clips
                    .iter()
                    .map(|(id, d, w, h)| (id.to_string(), (*d, *w, *h)))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl ClipResolver for FakeResolver {
        async fn resolve(&self, asset: &Asset, raw_dir: &Path) -> RenderResult<ResolvedClip> {
            let (dur, w, h) = self
                .clips
                .get(&asset.asset_id)
                .copied()
                .ok_or_else(|| RenderError::source_asset("download failed"))?;
            Ok(ResolvedClip {
                path: raw_dir.join(asset.cache_file_name()),
                duration_sec: dur,
                width: w,
                height: h,
            })
        }
    }

    fn asset(id: &str, tier: Tier) -> Asset {
        Asset {
            source: AssetSource::Pexels,
            asset_id: id.to_string(),
            author: "Ann".into(),
            page_url: format!("https://www.pexels.com/video/{}/", id),
            download_url: format!("https://cdn/{}", id),
            width: 1920,
            height: 1080,
            license_url: AssetSource::Pexels.license_url().to_string(),
            tier,
            query: "city hall".into(),
        }
    }

    fn total(a: &Assembly) -> f64 {
        a.segments.iter().map(|s| s.dur_sec).sum()
    }

    #[tokio::test]
    async fn test_exact_cover_with_tail_trim() {
        let assets = vec![asset("1", Tier::Title), asset("2", Tier::Title), asset("3", Tier::Title)];
        let resolver = FakeResolver::new(&[
            ("1", 30.0, 1920, 1080),
            ("2", 25.0, 1920, 1080),
            ("3", 40.0, 1920, 1080),
        ]);
        let mut rng = EpisodeRng::from_seed(7);
        let out = assemble_exact(&assets, 47.25, Path::new("/raw"), &mut rng, &resolver)
            .await
            .unwrap();
        assert!((total(&out) - 47.25).abs() < 1e-9);
        let trim = out.trimmed_last.as_ref().unwrap();
        assert!(trim.new_duration_sec >= MIN_TRIMMED_TAIL_SEC);
        let last = out.segments.last().unwrap();
        assert!((last.dur_sec - trim.new_duration_sec).abs() < 1e-9);
        assert!(out.provenance.iter().all(|p| p.mode == ClipMode::Full));
    }

    #[tokio::test]
    async fn test_repeats_when_pool_exhausted() {
        // Two candidates, one of which never resolves: ten attempts yield
        // five 20s segments, short of the 150s audio, so the repeat phase
        // has to cover the remaining 50s.
        let assets = vec![asset("ok", Tier::Title), asset("broken", Tier::Title)];
        let resolver = FakeResolver::new(&[("ok", 20.0, 1920, 1080)]);
        let mut rng = EpisodeRng::from_seed(1);
        let out = assemble_exact(&assets, 150.0, Path::new("/raw"), &mut rng, &resolver)
            .await
            .unwrap();
        assert!((total(&out) - 150.0).abs() < 1e-9);
        assert_eq!(out.segments.len(), 8);
        assert!(out.provenance[..5].iter().all(|p| p.mode == ClipMode::Full));
        assert!(out.provenance[5..].iter().all(|p| p.mode == ClipMode::Repeat));
        assert_eq!(
            out.provenance[5].repeat_of.as_deref(),
            Some(out.provenance[0].clip_name.as_str())
        );
        // 100s of full passes, two 20s repeats, and a trimmed 10s tail.
        assert!((out.segments[7].dur_sec - 10.0).abs() < 1e-9);
        let trim = out.trimmed_last.as_ref().unwrap();
        assert!((trim.trim_sec - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_vertical_and_short_assets_skipped() {
        let assets = vec![
            asset("tall", Tier::Title),
            asset("short", Tier::Title),
            asset("good", Tier::Title),
        ];
        let resolver = FakeResolver::new(&[
            ("tall", 60.0, 720, 1280),
            ("short", 10.0, 1920, 1080),
            ("good", 30.0, 1920, 1080),
        ]);
        let mut rng = EpisodeRng::from_seed(3);
        let out = assemble_exact(&assets, 25.0, Path::new("/raw"), &mut rng, &resolver)
            .await
            .unwrap();
        assert!(out
            .provenance
            .iter()
            .all(|p| p.asset_id == "good"));
        assert!((total(&out) - 25.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_tier1_required() {
        let assets = vec![asset("1", Tier::Keyword), asset("2", Tier::Generic)];
        let resolver = FakeResolver::new(&[("1", 30.0, 1920, 1080)]);
        let mut rng = EpisodeRng::from_seed(5);
        let err = assemble_exact(&assets, 30.0, Path::new("/raw"), &mut rng, &resolver)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::InsufficientAssets(_)));
    }

    #[tokio::test]
    async fn test_all_downloads_failing_is_fatal() {
        let assets = vec![asset("1", Tier::Title)];
        let resolver = FakeResolver::new(&[]);
        let mut rng = EpisodeRng::from_seed(5);
        let err = assemble_exact(&assets, 30.0, Path::new("/raw"), &mut rng, &resolver)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::InsufficientAssets(_)));
    }

    #[tokio::test]
    async fn test_tail_under_minimum_fails() {
        // One 20s source against 40.05s of audio: the third pass lands at
        // 60.0 and the trim would leave only 0.05s.
        let assets = vec![asset("1", Tier::Title)];
        let resolver = FakeResolver::new(&[("1", 20.0, 1920, 1080)]);
        let mut rng = EpisodeRng::from_seed(2);
        let err = assemble_exact(&assets, 40.05, Path::new("/raw"), &mut rng, &resolver)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Assembly(_)));
    }
}
