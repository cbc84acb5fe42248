//! Render segments and the absolute-timeline segment plan.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::timecode::format_seconds;

/// A time-bounded reference into one downloaded source clip.
///
/// Owned exclusively by the render pass that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Local path of the downloaded source file.
    pub path: PathBuf,
    /// In-point within the source, seconds.
    pub start_sec: f64,
    /// Window length, seconds.
    pub dur_sec: f64,
}

impl Segment {
    pub fn new(path: impl Into<PathBuf>, start_sec: f64, dur_sec: f64) -> Self {
        Self {
            path: path.into(),
            start_sec,
            dur_sec,
        }
    }
}

/// Position of a plan entry on the output timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Intro,
    Clip,
    Outro,
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentKind::Intro => f.write_str("intro"),
            SegmentKind::Clip => f.write_str("clip"),
            SegmentKind::Outro => f.write_str("outro"),
        }
    }
}

/// Materialized absolute-timeline view of one segment.
///
/// Used only for logging and duration guards during execution; never
/// mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub kind: SegmentKind,
    /// Clip index within the main run (clips only).
    pub idx: Option<usize>,
    /// Source file name (clips only).
    pub file: Option<String>,
    /// In-point within the source file, seconds (clips only).
    pub src_start: Option<f64>,
    /// Window length within the source file, seconds (clips only).
    pub src_dur: Option<f64>,
    pub abs_start: f64,
    pub abs_end: f64,
    pub dur: f64,
}

impl PlanEntry {
    /// Short key for logs, stable across heartbeats.
    pub fn log_key(&self) -> String {
        match self.kind {
            SegmentKind::Clip => format!(
                "clip:{}:{}",
                self.idx.map(|i| i.to_string()).unwrap_or_default(),
                self.file.as_deref().unwrap_or("")
            ),
            other => other.to_string(),
        }
    }
}

/// Ordered intro/clips/outro plan over the output timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentPlan {
    pub entries: Vec<PlanEntry>,
    /// Expected total output duration, seconds.
    pub expected_total: f64,
}

impl SegmentPlan {
    /// Build the plan from intro/outro silence durations and the main segments.
    pub fn build(segments: &[Segment], intro_silence: f64, outro_silence: f64) -> Self {
        let mut entries = Vec::with_capacity(segments.len() + 2);
        let mut abs_t = 0.0;
        entries.push(PlanEntry {
            kind: SegmentKind::Intro,
            idx: None,
            file: None,
            src_start: None,
            src_dur: None,
            abs_start: abs_t,
            abs_end: abs_t + intro_silence,
            dur: intro_silence,
        });
        abs_t += intro_silence;
        for (i, seg) in segments.iter().enumerate() {
            let file = seg
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            entries.push(PlanEntry {
                kind: SegmentKind::Clip,
                idx: Some(i),
                file,
                src_start: Some(seg.start_sec),
                src_dur: Some(seg.dur_sec),
                abs_start: abs_t,
                abs_end: abs_t + seg.dur_sec,
                dur: seg.dur_sec,
            });
            abs_t += seg.dur_sec;
        }
        entries.push(PlanEntry {
            kind: SegmentKind::Outro,
            idx: None,
            file: None,
            src_start: None,
            src_dur: None,
            abs_start: abs_t,
            abs_end: abs_t + outro_silence,
            dur: outro_silence,
        });
        abs_t += outro_silence;
        Self {
            entries,
            expected_total: abs_t,
        }
    }

    /// Find the entry covering an output timestamp.
    pub fn entry_at(&self, out_sec: f64) -> Option<&PlanEntry> {
        self.entries
            .iter()
            .find(|e| out_sec >= e.abs_start && out_sec < e.abs_end)
    }

    /// Cumulative planned duration.
    pub fn planned_total(&self) -> f64 {
        self.entries.iter().map(|e| e.dur).sum()
    }

    /// Source files that appear more than once, with their clip indices.
    pub fn repeated_files(&self) -> Vec<(String, Vec<usize>)> {
        let mut by_file: Vec<(String, Vec<usize>)> = Vec::new();
        for e in &self.entries {
            let (Some(file), Some(idx)) = (e.file.as_deref(), e.idx) else {
                continue;
            };
            match by_file.iter_mut().find(|(f, _)| f == file) {
                Some((_, idxs)) => idxs.push(idx),
                None => by_file.push((file.to_string(), vec![idx])),
            }
        }
        by_file.retain(|(_, idxs)| idxs.len() > 1);
        by_file
    }

    /// One line per entry for plan logs.
    pub fn describe(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| match e.kind {
                SegmentKind::Clip => format!(
                    "kind=clip idx={} file={} src_start={:.3} src_dur={:.3} abs_start={} abs_end={}",
                    e.idx.unwrap_or(0),
                    e.file.as_deref().unwrap_or(""),
                    e.src_start.unwrap_or(0.0),
                    e.src_dur.unwrap_or(0.0),
                    format_seconds(e.abs_start),
                    format_seconds(e.abs_end),
                ),
                kind => format!(
                    "kind={} abs_start={} abs_end={} dur={:.3}",
                    kind,
                    format_seconds(e.abs_start),
                    format_seconds(e.abs_end),
                    e.dur,
                ),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> SegmentPlan {
        let segments = vec![
            Segment::new("/w/raw/pexels-1.mp4", 0.0, 30.0),
            Segment::new("/w/raw/pixabay-2.mp4", 0.0, 17.25),
        ];
        SegmentPlan::build(&segments, 5.0, 5.0)
    }

    #[test]
    fn test_plan_totals() {
        let p = plan();
        assert_eq!(p.entries.len(), 4);
        assert!((p.expected_total - 57.25).abs() < 1e-9);
        assert!((p.planned_total() - p.expected_total).abs() < 1e-9);
    }

    #[test]
    fn test_entry_at_boundaries() {
        let p = plan();
        assert_eq!(p.entry_at(0.0).unwrap().kind, SegmentKind::Intro);
        assert_eq!(p.entry_at(5.0).unwrap().kind, SegmentKind::Clip);
        assert_eq!(p.entry_at(5.0).unwrap().idx, Some(0));
        assert_eq!(p.entry_at(36.0).unwrap().idx, Some(1));
        assert_eq!(p.entry_at(52.3).unwrap().kind, SegmentKind::Outro);
        assert!(p.entry_at(57.25).is_none());
    }

    #[test]
    fn test_repeated_files() {
        let segments = vec![
            Segment::new("/w/raw/a.mp4", 0.0, 10.0),
            Segment::new("/w/raw/b.mp4", 0.0, 10.0),
            Segment::new("/w/raw/a.mp4", 0.0, 10.0),
        ];
        let p = SegmentPlan::build(&segments, 1.0, 1.0);
        let reps = p.repeated_files();
        assert_eq!(reps, vec![("a.mp4".to_string(), vec![0, 2])]);
    }
}
