//! Episode render orchestration.
//!
//! Runs the full one-pass flow: fetch audio, plan and filter queries,
//! search providers, assemble segments, build and supervise the encode,
//! verify the artifact, and write the video plus its manifest.

use std::path::PathBuf;

use tracing::{info, warn};
use vpod_media::{
    build_render_graph, ensure_frame_canvas, get_duration, probe_video, run_render, verify_output,
    GraphSpec, RenderGuards, VerifySpec,
};
use vpod_models::timecode::make_timecoded_url;
use vpod_models::{
    safe_slug, ClipProvenance, Episode, EpisodeRng, LicenseNotes, Manifest, Segment, TimelineEntry,
};
use vpod_sources::{search_assets, ProviderClients};

use crate::assembler::{assemble_exact, HttpClipResolver};
use crate::clip_cache::{build_clip_library, ClipLibrary};
use crate::config::RenderContext;
use crate::error::{RenderError, RenderResult};
use crate::hash::sha256_file;
use crate::plan::plan_queries;

/// Names and paths of a finished render.
#[derive(Debug, Clone)]
pub struct RenderedEpisode {
    pub video_asset_name: String,
    pub manifest_asset_name: String,
    pub video_path: PathBuf,
    pub manifest_path: PathBuf,
}

/// Absolute-timeline provenance rows for the manifest.
fn build_timeline(
    segments: &[Segment],
    provenance: &[ClipProvenance],
    intro_silence_sec: f64,
) -> Vec<TimelineEntry> {
    let mut out = Vec::with_capacity(segments.len());
    let mut t_abs = intro_silence_sec;
    for (seg, prov) in segments.iter().zip(provenance) {
        let page_url = if prov.page_url.is_empty() {
            prov.source.page_url_for(&prov.asset_id)
        } else {
            prov.page_url.clone()
        };
        let src_end = seg.start_sec + seg.dur_sec;
        out.push(TimelineEntry {
            file: seg
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            source: prov.source,
            asset_id: prov.asset_id.clone(),
            page_url_timecoded: make_timecoded_url(&page_url, seg.start_sec, src_end),
            page_url,
            src_start_sec: seg.start_sec,
            src_end_sec: src_end,
            src_dur_sec: seg.dur_sec,
            out_abs_start_sec: t_abs,
            out_abs_end_sec: t_abs + seg.dur_sec,
        });
        t_abs += seg.dur_sec;
    }
    out
}

/// Render one episode end to end. Returns the produced asset names.
pub async fn render_episode(ctx: &RenderContext, ep: &Episode) -> RenderResult<RenderedEpisode> {
    let mut rng = EpisodeRng::for_guid(&ep.guid);
    let slug = safe_slug(&ep.title, 60);
    let video_asset = format!("{}_{}.mp4", ep.guid, slug);
    let manifest_asset = format!("{}_{}.json", ep.guid, slug);

    info!(guid = %ep.guid, title = %ep.title, "rendering episode");

    let work = ctx.work_dir.join(&ep.guid);
    let _ = tokio::fs::remove_dir_all(&work).await;
    tokio::fs::create_dir_all(&work).await?;

    let audio_path = work.join("audio.mp3");
    vpod_media::download(&ep.audio_url, &audio_path).await?;
    let audio_dur = get_duration(&audio_path).await?;
    info!(audio_sec = format!("{:.3}", audio_dur), "audio fetched");

    let (queries, policy) = plan_queries(
        &ep.title,
        &ep.description,
        ctx.max_queries,
        &ctx.search_prefix,
    );

    let clients = ProviderClients::new(ctx.pexels_key.clone(), ctx.pixabay_key.clone())?;
    let report = search_assets(&clients, &queries).await;
    if report.assets.is_empty() {
        return Err(RenderError::insufficient("no candidate assets found"));
    }

    let intro_info = probe_video(&ctx.intro_outro_path).await?;
    let intro_silence = intro_info.duration;
    if intro_silence <= 0.01 {
        return Err(RenderError::assembly("intro/outro duration is invalid"));
    }
    let outro_silence = intro_silence;
    info!(
        audio_sec = format!("{:.3}", audio_dur),
        intro_sec = format!("{:.3}", intro_silence),
        total_sec = format!("{:.3}", intro_silence + audio_dur + outro_silence),
        "timeline durations"
    );

    let raw_dir = work.join("raw");
    tokio::fs::create_dir_all(&raw_dir).await?;
    let assembly = assemble_exact(
        &report.assets,
        audio_dur,
        &raw_dir,
        &mut rng,
        &HttpClipResolver,
    )
    .await?;

    // Pre-render the overlay onto a 16:9 canvas; fall back to the raw
    // art if that fails.
    let frame_canvas = work.join("frame_16x9.png");
    let frame_path = match ensure_frame_canvas(&ctx.frame_path, &frame_canvas).await {
        Ok(()) => frame_canvas,
        Err(e) => {
            warn!(error = %e, "frame canvas preprocessing failed, using original art");
            ctx.frame_path.clone()
        }
    };

    let final_video = work.join("video.mp4");
    let graph = build_render_graph(&GraphSpec {
        segments: assembly.segments.clone(),
        audio_path: audio_path.clone(),
        intro_outro_path: ctx.intro_outro_path.clone(),
        frame_path,
        output_path: final_video.clone(),
        main_dur_sec: audio_dur,
        intro_silence_sec: intro_silence,
        outro_silence_sec: outro_silence,
        faststart: ctx.faststart,
    })?;

    let outcome = run_render(&graph, &RenderGuards::default()).await?;
    let probed = verify_output(&final_video, &VerifySpec::final_render(graph.expected_total)).await?;
    if outcome.backward_jumps > 0 {
        warn!(jumps = outcome.backward_jumps, "output time jumped backward during encode");
    }

    tokio::fs::create_dir_all(&ctx.out_videos_dir).await?;
    tokio::fs::create_dir_all(&ctx.out_manifests_dir).await?;
    let video_out = ctx.out_videos_dir.join(&video_asset);
    let manifest_out = ctx.out_manifests_dir.join(&manifest_asset);
    tokio::fs::copy(&final_video, &video_out).await?;

    let manifest = Manifest {
        guid: ep.guid.clone(),
        title: ep.title.clone(),
        description: ep.description.clone(),
        pub_date: ep.pub_date.clone(),
        audio_url: ep.audio_url.clone(),
        rendered_at: chrono::Utc::now().to_rfc3339(),
        video_asset_name: video_asset.clone(),
        manifest_asset_name: manifest_asset.clone(),
        render_mode: "one_pass".to_string(),
        audio_sha256: sha256_file(&audio_path).await?,
        video_sha256: sha256_file(&video_out).await?,
        audio_duration_sec: audio_dur,
        intro_silence_sec: intro_silence,
        outro_silence_sec: outro_silence,
        expected_total_sec: graph.expected_total,
        final_duration_sec: probed.duration,
        segments_count: assembly.segments.len(),
        duration_log: assembly.duration_log,
        segments_timeline: build_timeline(&assembly.segments, &assembly.provenance, intro_silence),
        trimmed_last: assembly.trimmed_last,
        final_ffmpeg_cmd: graph.command_line(),
        query_policy: policy,
        provenance: assembly.provenance,
        license_notes: LicenseNotes::default(),
    };
    tokio::fs::write(&manifest_out, serde_json::to_vec_pretty(&manifest)?).await?;

    let _ = tokio::fs::remove_dir_all(&work).await;

    info!(
        video = %video_out.display(),
        manifest = %manifest_out.display(),
        wall_sec = format!("{:.1}", outcome.wall_secs),
        "episode rendered"
    );
    Ok(RenderedEpisode {
        video_asset_name: video_asset,
        manifest_asset_name: manifest_asset,
        video_path: video_out,
        manifest_path: manifest_out,
    })
}

/// Build and publish the cached clip library for an episode.
///
/// Independent of the audio: plans queries, searches, cuts the ordered
/// fifteen-second set, and copies the archive into the clips output
/// directory under its content hash.
pub async fn build_episode_clip_library(
    ctx: &RenderContext,
    ep: &Episode,
    need: usize,
) -> RenderResult<ClipLibrary> {
    let mut rng = EpisodeRng::for_guid(&ep.guid);
    let (queries, _policy) = plan_queries(
        &ep.title,
        &ep.description,
        ctx.max_queries,
        &ctx.search_prefix,
    );
    let clients = ProviderClients::new(ctx.pexels_key.clone(), ctx.pixabay_key.clone())?;
    let report = search_assets(&clients, &queries).await;
    if report.assets.is_empty() {
        return Err(RenderError::insufficient("no candidate assets found"));
    }

    let library = build_clip_library(
        &ep.guid,
        &queries,
        &report.assets,
        need,
        &mut rng,
        &ctx.work_dir,
        &HttpClipResolver,
    )
    .await?;

    tokio::fs::create_dir_all(&ctx.out_clips_dir).await?;
    let published = ctx.out_clips_dir.join(&library.zip_asset_name);
    tokio::fs::copy(&library.zip_path, &published).await?;
    info!(
        guid = %ep.guid,
        zip = %published.display(),
        sha256 = %library.zip_sha256,
        "clip library published"
    );
    Ok(library)
}
