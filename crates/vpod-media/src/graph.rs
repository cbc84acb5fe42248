//! One-pass render graph builder.
//!
//! Builds a single ffmpeg invocation that trims and normalizes every
//! source segment, concatenates them, overlays the frame art, wraps the
//! result in intro/outro from a shared bumper asset, lays normalized
//! episode audio over the main body, and hard-caps the output timeline
//! to the expected total during the only encode. Pure: no process is
//! spawned here.

use std::path::{Path, PathBuf};

use tracing::warn;
use vpod_models::{Segment, SegmentPlan};

use crate::error::{MediaError, MediaResult};

pub const TARGET_W: u32 = 1920;
pub const TARGET_H: u32 = 1080;
pub const TARGET_FPS: u32 = 30;

/// Everything the builder needs to assemble the final encode.
#[derive(Debug, Clone)]
pub struct GraphSpec {
    /// Main-body segments, in output order.
    pub segments: Vec<Segment>,
    /// Episode audio file.
    pub audio_path: PathBuf,
    /// Bumper video used for both intro and outro.
    pub intro_outro_path: PathBuf,
    /// Frame art overlaid on the main body (PNG with alpha).
    pub frame_path: PathBuf,
    /// Final output file.
    pub output_path: PathBuf,
    /// Main body duration, seconds (the episode audio length).
    pub main_dur_sec: f64,
    /// Silent lead-in over the intro, seconds.
    pub intro_silence_sec: f64,
    /// Silent tail over the outro, seconds.
    pub outro_silence_sec: f64,
    /// Add `-movflags +faststart` (second output pass; off by default).
    pub faststart: bool,
}

/// A fully built ffmpeg invocation plus its timeline plan.
#[derive(Debug, Clone)]
pub struct RenderGraph {
    /// Complete argument list (everything after the `ffmpeg` program name).
    pub args: Vec<String>,
    pub filter_complex: String,
    pub plan: SegmentPlan,
    /// Expected output duration, seconds. The graph trims to exactly this.
    pub expected_total: f64,
}

impl RenderGraph {
    /// The invocation as one printable line, recorded in the manifest.
    pub fn command_line(&self) -> String {
        let mut parts = vec!["ffmpeg".to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Per-stream normalization: fit to the target canvas, letterbox, reset
/// SAR metadata (some providers ship pathological SAR, and concat
/// requires it to match), normalize fps and pixel format.
fn vf_base() -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,\
         setsar=1,\
         fps={fps},\
         format=yuv420p",
        w = TARGET_W,
        h = TARGET_H,
        fps = TARGET_FPS
    )
}

fn require_file(path: &Path, what: &str) -> MediaResult<()> {
    if !path.exists() {
        return Err(MediaError::graph(format!(
            "{} not found: {}",
            what,
            path.display()
        )));
    }
    Ok(())
}

/// Build the one-pass render graph.
///
/// Validates inputs up front so a malformed plan fails before any encode
/// time is spent.
pub fn build_render_graph(spec: &GraphSpec) -> MediaResult<RenderGraph> {
    require_file(&spec.intro_outro_path, "intro/outro video")?;
    require_file(&spec.frame_path, "frame art")?;
    require_file(&spec.audio_path, "episode audio")?;
    if spec.segments.is_empty() {
        return Err(MediaError::graph("no segments provided"));
    }
    if spec.main_dur_sec <= 0.01 {
        return Err(MediaError::graph("main duration is invalid"));
    }
    if spec.intro_silence_sec < 0.0 || spec.outro_silence_sec < 0.0 {
        return Err(MediaError::graph("intro/outro silence duration is invalid"));
    }
    for (i, seg) in spec.segments.iter().enumerate() {
        require_file(&seg.path, "segment source")?;
        if seg.dur_sec <= 0.01 {
            return Err(MediaError::graph(format!("segment {} duration too short", i)));
        }
    }

    let vf = vf_base();
    let expected_total = spec.intro_silence_sec + spec.main_dur_sec + spec.outro_silence_sec;
    let plan = SegmentPlan::build(&spec.segments, spec.intro_silence_sec, spec.outro_silence_sec);

    // Cumulative per-segment rounding can drift the planned clip timeline
    // away from the audio-derived main duration.
    let tol = 1.0 / f64::from(TARGET_FPS.max(1)) + 0.05;
    if (plan.planned_total() - expected_total).abs() > tol {
        warn!(
            planned = plan.planned_total(),
            expected = expected_total,
            tol,
            "planned timeline does not match expected total"
        );
    }

    // Inputs:
    //   0: intro/outro video
    //   1: episode audio
    //   2: frame art (looped)
    //   3..: raw source segments
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-nostats".into(),
        "-progress".into(),
        "pipe:1".into(),
        "-i".into(),
        spec.intro_outro_path.to_string_lossy().into_owned(),
        "-i".into(),
        spec.audio_path.to_string_lossy().into_owned(),
        "-loop".into(),
        "1".into(),
        "-i".into(),
        spec.frame_path.to_string_lossy().into_owned(),
    ];
    for seg in &spec.segments {
        args.push("-i".into());
        args.push(seg.path.to_string_lossy().into_owned());
    }

    let mut parts: Vec<String> = Vec::new();
    let mut v_labels = String::new();
    for (i, seg) in spec.segments.iter().enumerate() {
        let label = format!("v{:02}", i);
        parts.push(format!(
            "[{idx}:v]trim=start={start:.3}:duration={dur:.3},setpts=PTS-STARTPTS,{vf}[{label}]",
            idx = 3 + i,
            start = seg.start_sec,
            dur = seg.dur_sec,
            vf = vf,
            label = label
        ));
        v_labels.push_str(&format!("[{}]", label));
    }

    parts.push(format!(
        "{}concat=n={}:v=1:a=0[main_pre]",
        v_labels,
        spec.segments.len()
    ));

    // Frame art scaled by height against the main body, centered, alpha
    // preserved until the final format conversion.
    parts.push(
        "[2:v]format=rgba[frame];\
         [frame][main_pre]scale2ref=w=-1:h=main_h[frame_m][main_ref];\
         [main_ref][frame_m]overlay=x=(main_w-overlay_w)/2:y=(main_h-overlay_h)/2:shortest=1,format=yuv420p[mainv]"
            .to_string(),
    );

    // Intro and outro come from the same bumper, trimmed independently.
    parts.push(format!(
        "[0:v]split=2[i0][o0];\
         [i0]trim=0:{intro:.3},setpts=PTS-STARTPTS,{vf}[introv];\
         [o0]trim=0:{outro:.3},setpts=PTS-STARTPTS,{vf}[outrov]",
        intro = spec.intro_silence_sec,
        outro = spec.outro_silence_sec,
        vf = vf
    ));

    // Silence under the bumpers, loudness-normalized episode audio under
    // the main body.
    parts.push(format!(
        "anullsrc=r=44100:cl=stereo,atrim=0:{intro:.3},asetpts=N/SR/TB[introa];\
         [1:a]aformat=sample_fmts=fltp:sample_rates=44100:channel_layouts=stereo,\
         loudnorm=I=-16:TP=-1.5:LRA=11,atrim=0:{main:.3},asetpts=N/SR/TB[maina];\
         anullsrc=r=44100:cl=stereo,atrim=0:{outro:.3},asetpts=N/SR/TB[outroa]",
        intro = spec.intro_silence_sec,
        main = spec.main_dur_sec,
        outro = spec.outro_silence_sec
    ));

    // Hard-cap the final timeline during the only encode so cumulative
    // frame rounding cannot extend the output.
    parts.push(format!(
        "[introv][introa][mainv][maina][outrov][outroa]concat=n=3:v=1:a=1[v0][a0];\
         [v0]trim=duration={total:.3},setpts=PTS-STARTPTS[v];\
         [a0]atrim=duration={total:.3},asetpts=N/SR/TB[a]",
        total = expected_total
    ));

    let filter_complex = parts.join(";");

    args.push("-filter_complex".into());
    args.push(filter_complex.clone());
    args.extend(
        [
            "-map", "[v]", "-map", "[a]", "-c:v", "libx264", "-preset", "veryfast", "-pix_fmt",
            "yuv420p",
        ]
        .map(String::from),
    );
    args.push("-r".into());
    args.push(TARGET_FPS.to_string());
    args.extend(["-c:a", "aac", "-b:a", "192k"].map(String::from));
    if spec.faststart {
        args.push("-movflags".into());
        args.push("+faststart".into());
    }
    args.push(spec.output_path.to_string_lossy().into_owned());

    Ok(RenderGraph {
        args,
        filter_complex,
        plan,
        expected_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let p = dir.path().join(name);
        fs::write(&p, b"x").unwrap();
        p
    }

    fn spec(dir: &TempDir) -> GraphSpec {
        let s1 = touch(dir, "pexels-1.mp4");
        let s2 = touch(dir, "pixabay-2.mp4");
        GraphSpec {
            segments: vec![Segment::new(s1, 0.0, 30.0), Segment::new(s2, 2.0, 17.25)],
            audio_path: touch(dir, "episode.mp3"),
            intro_outro_path: touch(dir, "bumper.mp4"),
            frame_path: touch(dir, "frame.png"),
            output_path: dir.path().join("out.mp4"),
            main_dur_sec: 47.25,
            intro_silence_sec: 5.0,
            outro_silence_sec: 5.0,
            faststart: false,
        }
    }

    #[test]
    fn test_expected_total_and_plan() {
        let dir = TempDir::new().unwrap();
        let graph = build_render_graph(&spec(&dir)).unwrap();
        assert!((graph.expected_total - 57.25).abs() < 1e-9);
        assert_eq!(graph.plan.entries.len(), 4);
        assert!((graph.plan.planned_total() - graph.expected_total).abs() < 1e-9);
    }

    #[test]
    fn test_filter_contains_trim_and_guardrails() {
        let dir = TempDir::new().unwrap();
        let graph = build_render_graph(&spec(&dir)).unwrap();
        assert!(graph.filter_complex.contains("trim=start=0.000:duration=30.000"));
        assert!(graph.filter_complex.contains("trim=start=2.000:duration=17.250"));
        assert!(graph.filter_complex.contains("setsar=1"));
        assert!(graph.filter_complex.contains("concat=n=2:v=1:a=0[main_pre]"));
        assert!(graph.filter_complex.contains("loudnorm=I=-16:TP=-1.5:LRA=11"));
        assert!(graph.filter_complex.contains("trim=duration=57.250"));
        assert!(graph.filter_complex.contains("atrim=duration=57.250"));
    }

    #[test]
    fn test_args_shape() {
        let dir = TempDir::new().unwrap();
        let graph = build_render_graph(&spec(&dir)).unwrap();
        // 3 fixed inputs plus 2 segment inputs.
        assert_eq!(graph.args.iter().filter(|a| *a == "-i").count(), 5);
        assert!(graph.args.contains(&"-progress".to_string()));
        assert!(graph.args.contains(&"pipe:1".to_string()));
        assert!(graph.args.contains(&"libx264".to_string()));
        assert!(graph.args.contains(&"veryfast".to_string()));
        assert!(!graph.args.contains(&"-movflags".to_string()));
        assert!(graph.command_line().starts_with("ffmpeg -y"));
    }

    #[test]
    fn test_faststart_flag() {
        let dir = TempDir::new().unwrap();
        let mut s = spec(&dir);
        s.faststart = true;
        let graph = build_render_graph(&s).unwrap();
        let pos = graph.args.iter().position(|a| a == "-movflags").unwrap();
        assert_eq!(graph.args[pos + 1], "+faststart");
        // Output path stays last.
        assert_eq!(
            graph.args.last().map(String::as_str),
            s.output_path.to_str()
        );
    }

    #[test]
    fn test_rejects_empty_segments() {
        let dir = TempDir::new().unwrap();
        let mut s = spec(&dir);
        s.segments.clear();
        assert!(matches!(
            build_render_graph(&s),
            Err(MediaError::GraphBuild(_))
        ));
    }

    #[test]
    fn test_rejects_missing_files_and_short_segments() {
        let dir = TempDir::new().unwrap();
        let mut s = spec(&dir);
        s.frame_path = dir.path().join("missing.png");
        assert!(build_render_graph(&s).is_err());

        let mut s = spec(&dir);
        s.segments[1].dur_sec = 0.005;
        assert!(build_render_graph(&s).is_err());
    }
}
