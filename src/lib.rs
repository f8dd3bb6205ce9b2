//! Narravid turns a text document and its synthesized narration audio into a single
//! talking-avatar video with synchronized captions.
//!
//! # Pipeline overview
//!
//! 1. **Probe**: extract the authoritative duration from the narration audio (`ffprobe`)
//! 2. **Segment**: split the text into timed caption segments proportional to word count
//! 3. **Capture**: drive the scene renderer at a fixed frame rate, one PNG per tick
//! 4. **Compile**: mux the frame sequence with the audio into an MP4 (`ffmpeg`)
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Frame-accurate sync**: frame `i` always reflects caption and animation state at
//!   `t = i / fps`; a failed frame fails the run rather than desynchronizing the rest.
//! - **Deterministic-by-default**: all motion derives from the timestamp and a seed.
//! - **Unconditional cleanup**: the per-run staging directory never outlives the run.

#![forbid(unsafe_code)]

mod capture;
mod encode;
mod extract;
mod foundation;
mod pipeline;
mod probe;
mod scene;
mod script;

pub use capture::{FRAME_PATTERN, capture_frames, frame_file_name};
pub use encode::{compile_video, ensure_parent_dir, is_ffmpeg_on_path};
pub use extract::extract_text;
pub use foundation::core::{Canvas, Fps, FrameRgba, total_frames};
pub use foundation::error::{NarravidError, NarravidResult, PipelineFailure, Stage};
pub use pipeline::{
    CancelToken, FfmpegBackend, MediaBackend, Pipeline, PipelineConfig, RunReport, RunRequest,
};
pub use probe::probe_audio_duration;
pub use scene::{
    AvatarScene, AvatarSceneFactory, BlinkState, RendererFactory, SceneConfig, SceneRenderer,
};
pub use script::{CaptionSegment, NarrationScript, active_caption_index, segment};
