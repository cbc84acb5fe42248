//! FFmpeg integration: render graph construction, supervised execution,
//! probing, output verification, downloads, and frame-art preparation.
//!
//! The split keeps everything testable without an encoder: the graph
//! builder and progress parser are pure, the supervisor's guard logic is
//! plain data, and only the outer functions spawn processes.

pub mod clip;
pub mod download;
pub mod error;
pub mod frame;
pub mod graph;
pub mod probe;
pub mod progress;
pub mod supervisor;
pub mod verify;

pub use clip::make_clip;
pub use download::{download, download_if_missing};
pub use error::{MediaError, MediaResult};
pub use frame::ensure_frame_canvas;
pub use graph::{build_render_graph, GraphSpec, RenderGraph, TARGET_FPS, TARGET_H, TARGET_W};
pub use probe::{get_duration, probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressParser};
pub use supervisor::{run_render, RenderGuards, RenderOutcome};
pub use verify::{duration_tolerance, verify_output, VerifySpec};
