//! FFmpeg `-progress` output parsing.
//!
//! The parser is a pure state machine over the key=value lines ffmpeg
//! writes to its progress pipe. One snapshot is emitted per `progress=`
//! tick, which is what the supervisor feeds its guards with.

use serde::{Deserialize, Serialize};

/// One progress snapshot, emitted at each `progress=` tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current encode FPS
    pub fps: f64,
    /// Output time in seconds, derived from `out_time_ms` (microseconds
    /// despite the name) or `out_time_us`.
    pub out_time_sec: f64,
    /// Output time as ffmpeg formatted it (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// True on the final `progress=end` tick
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Progress percentage given the expected total in seconds.
    pub fn percentage(&self, expected_total_sec: f64) -> f64 {
        if expected_total_sec <= 0.0 {
            return 0.0;
        }
        ((self.out_time_sec / expected_total_sec) * 100.0).min(100.0)
    }
}

/// Backward jump threshold in seconds. Small non-monotonic wobble from
/// interleaved streams is normal; only large jumps are worth flagging.
const BACKWARD_JUMP_SEC: f64 = 2.0;

/// Incremental parser for ffmpeg progress lines.
///
/// Feed lines in order; a snapshot comes back on each `progress=` tick.
/// Tracks backward jumps in output time across ticks.
#[derive(Debug, Default)]
pub struct ProgressParser {
    current: FfmpegProgress,
    last_out_time_sec: Option<f64>,
    backward_jumps: u64,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of backward out_time jumps observed so far.
    pub fn backward_jumps(&self) -> u64 {
        self.backward_jumps
    }

    /// Feed one line. Returns a snapshot when the line completes a tick.
    pub fn feed_line(&mut self, line: &str) -> Option<FfmpegProgress> {
        let line = line.trim();
        let (key, value) = line.split_once('=')?;

        match key {
            // ffmpeg's out_time_ms is microseconds, same as out_time_us.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current.out_time_sec = us as f64 / 1_000_000.0;
                }
            }
            "out_time" => {
                self.current.out_time = value.to_string();
            }
            "frame" => {
                if let Ok(frame) = value.parse() {
                    self.current.frame = frame;
                }
            }
            "fps" => {
                if let Ok(fps) = value.parse() {
                    self.current.fps = fps;
                }
            }
            "speed" => {
                if value != "N/A" {
                    if let Some(speed_str) = value.strip_suffix('x') {
                        if let Ok(speed) = speed_str.parse() {
                            self.current.speed = speed;
                        }
                    }
                }
            }
            "progress" => {
                if value == "end" {
                    self.current.is_complete = true;
                }
                if let Some(prev) = self.last_out_time_sec {
                    if self.current.out_time_sec + BACKWARD_JUMP_SEC < prev {
                        self.backward_jumps += 1;
                    }
                }
                self.last_out_time_sec = Some(self.current.out_time_sec);
                return Some(self.current.clone());
            }
            _ => {}
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(parser: &mut ProgressParser, lines: &[&str]) -> Option<FfmpegProgress> {
        let mut out = None;
        for line in lines {
            out = parser.feed_line(line);
        }
        out
    }

    #[test]
    fn test_snapshot_on_progress_tick() {
        let mut p = ProgressParser::new();
        assert!(p.feed_line("frame=120").is_none());
        assert!(p.feed_line("fps=60.2").is_none());
        assert!(p.feed_line("out_time_ms=5000000").is_none());
        let snap = p.feed_line("progress=continue").unwrap();
        assert_eq!(snap.frame, 120);
        assert!((snap.out_time_sec - 5.0).abs() < 1e-9);
        assert!(!snap.is_complete);
    }

    #[test]
    fn test_out_time_ms_is_microseconds() {
        let mut p = ProgressParser::new();
        let snap = tick(&mut p, &["out_time_ms=47250000", "progress=continue"]).unwrap();
        assert!((snap.out_time_sec - 47.25).abs() < 1e-9);
    }

    #[test]
    fn test_end_tick_marks_complete() {
        let mut p = ProgressParser::new();
        let snap = tick(&mut p, &["out_time_ms=1000000", "progress=end"]).unwrap();
        assert!(snap.is_complete);
    }

    #[test]
    fn test_speed_parsing() {
        let mut p = ProgressParser::new();
        let snap = tick(&mut p, &["speed=1.5x", "progress=continue"]).unwrap();
        assert!((snap.speed - 1.5).abs() < 1e-9);
        let snap = tick(&mut p, &["speed=N/A", "progress=continue"]).unwrap();
        assert!((snap.speed - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_backward_jump_detection() {
        let mut p = ProgressParser::new();
        tick(&mut p, &["out_time_ms=30000000", "progress=continue"]);
        // Small wobble is not a jump.
        tick(&mut p, &["out_time_ms=29500000", "progress=continue"]);
        assert_eq!(p.backward_jumps(), 0);
        tick(&mut p, &["out_time_ms=10000000", "progress=continue"]);
        assert_eq!(p.backward_jumps(), 1);
    }

    #[test]
    fn test_percentage() {
        let snap = FfmpegProgress {
            out_time_sec: 25.0,
            ..Default::default()
        };
        assert!((snap.percentage(50.0) - 50.0).abs() < 1e-9);
        assert!((snap.percentage(20.0) - 100.0).abs() < 1e-9);
        assert_eq!(snap.percentage(0.0), 0.0);
    }
}
