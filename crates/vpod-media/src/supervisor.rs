//! Supervised ffmpeg execution.
//!
//! Runs the one-pass render under watch: progress ticks are parsed off
//! the progress pipe, a heartbeat fires even when ffmpeg goes quiet,
//! stderr is drained to a bounded tail, and three guards can kill the
//! process early (stall, runaway output time, wall-clock timeout).

use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use vpod_models::format_seconds;

use crate::error::{MediaError, MediaResult};
use crate::graph::{RenderGraph, TARGET_FPS};
use crate::progress::ProgressParser;

/// Lines of stderr retained for failure reports.
const STDERR_TAIL_LINES: usize = 200;

/// Stderr lines logged verbatim before switching to sampling.
const STDERR_EARLY_LINES: u64 = 50;

/// After the early window, log every Nth stderr line.
const STDERR_SAMPLE_EVERY: u64 = 200;

/// Guard thresholds for a supervised run.
///
/// Pure data so the decisions can be tested without a process.
#[derive(Debug, Clone)]
pub struct RenderGuards {
    /// Kill if output time has not advanced for this long.
    pub stall_window_sec: f64,
    /// No stall verdicts during the initial warm-up.
    pub grace_sec: f64,
    /// Within this margin of the expected total, a quiet encoder is
    /// finalizing, not stalled.
    pub near_end_margin_sec: f64,
    /// Output time may exceed the expected total by this much plus two
    /// frames before the run counts as runaway.
    pub runaway_slack_sec: f64,
    /// Wall-clock ceiling for the whole run.
    pub timeout_secs: u64,
    /// Heartbeat log interval.
    pub heartbeat_sec: f64,
}

impl Default for RenderGuards {
    fn default() -> Self {
        Self {
            stall_window_sec: 240.0,
            grace_sec: 60.0,
            near_end_margin_sec: 0.25,
            runaway_slack_sec: 2.0,
            timeout_secs: 7200,
            heartbeat_sec: 30.0,
        }
    }
}

impl RenderGuards {
    /// Stall verdict from wall-clock age of the last timeline advance.
    pub fn is_stalled(
        &self,
        wall_sec: f64,
        advance_age_sec: f64,
        out_time_sec: f64,
        expected_total: f64,
    ) -> bool {
        let near_end = out_time_sec >= expected_total - self.near_end_margin_sec;
        !near_end && advance_age_sec >= self.stall_window_sec && wall_sec >= self.grace_sec
    }

    /// Maximum output time before the run counts as runaway.
    pub fn runaway_limit(&self, expected_total: f64, fps: u32) -> f64 {
        expected_total + self.runaway_slack_sec + 2.0 / f64::from(fps.max(1))
    }

    pub fn is_runaway(&self, out_time_sec: f64, expected_total: f64, fps: u32) -> bool {
        out_time_sec > self.runaway_limit(expected_total, fps)
    }
}

/// What a completed run looked like, for the manifest and logs.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    /// Final output time ffmpeg reported, seconds.
    pub last_out_time_sec: f64,
    /// Backward jumps in output time observed during the run.
    pub backward_jumps: u64,
    /// Wall-clock duration of the run, seconds.
    pub wall_secs: f64,
}

struct StderrTail {
    lines: Mutex<VecDeque<String>>,
    last_line_at: Mutex<Option<Instant>>,
}

impl StderrTail {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            lines: Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)),
            last_line_at: Mutex::new(None),
        })
    }

    fn push(&self, line: String) {
        if let Ok(mut at) = self.last_line_at.lock() {
            *at = Some(Instant::now());
        }
        let Ok(mut lines) = self.lines.lock() else {
            return;
        };
        if lines.len() == STDERR_TAIL_LINES {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Seconds since the last stderr line, if any arrived yet.
    fn age_secs(&self) -> Option<f64> {
        self.last_line_at
            .lock()
            .ok()
            .and_then(|at| at.map(|t| t.elapsed().as_secs_f64()))
    }

    fn tail(&self, n: usize) -> String {
        let Ok(lines) = self.lines.lock() else {
            return String::new();
        };
        let skip = lines.len().saturating_sub(n);
        lines
            .iter()
            .skip(skip)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

async fn kill_and_err(child: &mut Child, err: MediaError) -> MediaError {
    let _ = child.kill().await;
    err
}

/// Run the render graph under supervision.
pub async fn run_render(graph: &RenderGraph, guards: &RenderGuards) -> MediaResult<RenderOutcome> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    info!(
        segments = graph.plan.entries.len(),
        expected_total = %format_seconds(graph.expected_total),
        "starting render"
    );
    for line in graph.plan.describe() {
        debug!(plan = %line);
    }
    for (file, idxs) in graph.plan.repeated_files() {
        info!(file = %file, count = idxs.len(), "source repeats in plan");
    }
    debug!(cmd = %graph.command_line());

    let mut child = Command::new("ffmpeg")
        .args(&graph.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| MediaError::graph("progress pipe not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| MediaError::graph("stderr not captured"))?;

    let tail = StderrTail::new();
    let tail_writer = Arc::clone(&tail);
    let stderr_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stderr).lines();
        let mut count: u64 = 0;
        while let Ok(Some(line)) = reader.next_line().await {
            if line.is_empty() {
                continue;
            }
            count += 1;
            if count <= STDERR_EARLY_LINES || count % STDERR_SAMPLE_EVERY == 0 {
                debug!(ffmpeg = %line);
            }
            tail_writer.push(line);
        }
        count
    });

    let mut reader = BufReader::new(stdout).lines();
    let mut parser = ProgressParser::new();

    let start = Instant::now();
    let mut last_advance = Instant::now();
    let mut last_progress = Instant::now();
    let mut last_heartbeat = Instant::now();
    let mut last_out_sec = 0.0_f64;
    let mut last_seg_key = String::new();
    let mut last_logged_sec = -15.0_f64;
    let mut near_end_logged = false;

    loop {
        let wall_sec = start.elapsed().as_secs_f64();
        if wall_sec > guards.timeout_secs as f64 {
            let err = kill_and_err(&mut child, MediaError::Timeout(guards.timeout_secs)).await;
            let _ = stderr_task.await;
            return Err(err);
        }

        if last_heartbeat.elapsed().as_secs_f64() >= guards.heartbeat_sec {
            info!(
                wall_sec = format!("{:.1}", wall_sec),
                out_time = %format_seconds(last_out_sec),
                seg = %last_seg_key,
                prog_age_sec = format!("{:.1}", last_progress.elapsed().as_secs_f64()),
                adv_age_sec = format!("{:.1}", last_advance.elapsed().as_secs_f64()),
                stderr_age_sec = tail
                    .age_secs()
                    .map(|a| format!("{:.1}", a))
                    .unwrap_or_else(|| "none".to_string()),
                "render heartbeat"
            );
            last_heartbeat = Instant::now();
        }

        if guards.is_stalled(
            wall_sec,
            last_advance.elapsed().as_secs_f64(),
            last_out_sec,
            graph.expected_total,
        ) {
            warn!(
                seg = %last_seg_key,
                out_time = %format_seconds(last_out_sec),
                "output time not advancing, terminating"
            );
            let err = kill_and_err(
                &mut child,
                MediaError::Stalled {
                    stalled_secs: last_advance.elapsed().as_secs_f64(),
                    out_time: last_out_sec,
                },
            )
            .await;
            let _ = stderr_task.await;
            return Err(err);
        }

        // Bounded read so heartbeats and guards still fire when ffmpeg
        // goes quiet.
        let line = match tokio::time::timeout(Duration::from_secs(1), reader.next_line()).await {
            Err(_) => {
                if let Ok(Some(_)) = child.try_wait() {
                    break;
                }
                continue;
            }
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => break,
            Ok(Err(e)) => {
                let err = kill_and_err(&mut child, MediaError::Io(e)).await;
                let _ = stderr_task.await;
                return Err(err);
            }
        };

        let Some(snapshot) = parser.feed_line(&line) else {
            continue;
        };

        last_progress = Instant::now();
        if snapshot.out_time_sec > last_out_sec + 0.001 {
            last_advance = Instant::now();
        }
        last_out_sec = snapshot.out_time_sec;

        if let Some(entry) = graph.plan.entry_at(snapshot.out_time_sec) {
            let seg_key = entry.log_key();
            if seg_key != last_seg_key {
                info!(
                    seg = %seg_key,
                    abs = %format_seconds(snapshot.out_time_sec),
                    local = %format_seconds(snapshot.out_time_sec - entry.abs_start),
                    "segment switch"
                );
                last_seg_key = seg_key;
            }
        }

        if snapshot.out_time_sec - last_logged_sec >= 15.0 {
            last_logged_sec = snapshot.out_time_sec;
            debug!(
                abs = %format_seconds(snapshot.out_time_sec),
                seg = %last_seg_key,
                speed = snapshot.speed,
                "render progress"
            );
        }

        // Distinguish "done encoding" from "finalizing".
        if !near_end_logged
            && snapshot.out_time_sec >= graph.expected_total - 2.0 / f64::from(TARGET_FPS)
        {
            info!(
                abs = %format_seconds(snapshot.out_time_sec),
                expected_total = %format_seconds(graph.expected_total),
                "nearing end"
            );
            near_end_logged = true;
        }

        if guards.is_runaway(snapshot.out_time_sec, graph.expected_total, TARGET_FPS) {
            warn!(
                abs = %format_seconds(snapshot.out_time_sec),
                expected_total = %format_seconds(graph.expected_total),
                "output time exceeds expected total, terminating"
            );
            let err = kill_and_err(
                &mut child,
                MediaError::Runaway {
                    out_time: snapshot.out_time_sec,
                    expected: graph.expected_total,
                },
            )
            .await;
            let _ = stderr_task.await;
            return Err(err);
        }

        if snapshot.is_complete {
            break;
        }
    }

    let status = child.wait().await?;
    let _ = stderr_task.await;

    if !status.success() {
        return Err(MediaError::FfmpegFailed {
            code: status.code(),
            tail: tail.tail(50),
        });
    }

    let wall_secs = start.elapsed().as_secs_f64();
    info!(
        wall_sec = format!("{:.1}", wall_secs),
        out_time = %format_seconds(last_out_sec),
        backward_jumps = parser.backward_jumps(),
        "render complete"
    );

    Ok(RenderOutcome {
        last_out_time_sec: last_out_sec,
        backward_jumps: parser.backward_jumps(),
        wall_secs,
    })
}
