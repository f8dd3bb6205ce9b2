use std::path::Path;

use tracing::{debug, info};

use crate::foundation::{
    core::{Fps, total_frames},
    error::{NarravidError, NarravidResult},
};
use crate::pipeline::CancelToken;
use crate::scene::SceneRenderer;

/// ffmpeg image-sequence pattern matching [`frame_file_name`].
pub const FRAME_PATTERN: &str = "frame_%05d.png";

/// Zero-padded frame file name; lexicographic order equals temporal order, which the
/// video compiler's sequential input depends on.
pub fn frame_file_name(i: u64) -> String {
    format!("frame_{i:05}.png")
}

/// Drive the renderer at a fixed frame rate for the full duration, writing one PNG
/// per tick into `out_dir`. Returns the number of frames written.
///
/// Frames are captured strictly in increasing index order on one thread: blink-state
/// evolution depends on call order, so this loop must never be reordered or
/// parallelized against a single renderer.
pub fn capture_frames(
    renderer: &mut dyn SceneRenderer,
    duration: f64,
    fps: Fps,
    out_dir: &Path,
    cancel: &CancelToken,
) -> NarravidResult<u64> {
    fps.validate()?;
    if !duration.is_finite() || duration < 0.0 {
        return Err(NarravidError::validation(
            "capture duration must be finite and >= 0",
        ));
    }
    if !out_dir.is_dir() {
        return Err(NarravidError::validation(format!(
            "frame staging directory '{}' does not exist",
            out_dir.display()
        )));
    }

    let total = total_frames(duration, fps);
    if total == 0 {
        return Err(NarravidError::empty_output(
            "no frames to capture (zero-length timeline)",
        ));
    }
    debug!(total, fps = fps.0, duration, "capturing frames");

    for i in 0..total {
        if cancel.is_canceled() {
            return Err(NarravidError::canceled(format!(
                "frame capture interrupted at frame {i} of {total}"
            )));
        }
        let t = fps.frame_time(i);
        let frame = renderer.render_at(t)?;
        let path = out_dir.join(frame_file_name(i));
        image::save_buffer_with_format(
            &path,
            &frame.data,
            frame.width,
            frame.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .map_err(|e| {
            NarravidError::frame_render(format!(
                "failed to persist frame {i} to '{}': {e}",
                path.display()
            ))
        })?;
    }

    info!(frames = total, "frame capture complete");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::FrameRgba;

    /// Tiny deterministic test double; fails on demand at a given frame index.
    struct StubRenderer {
        calls: Vec<f64>,
        fail_at_call: Option<usize>,
    }

    impl StubRenderer {
        fn new(fail_at_call: Option<usize>) -> Self {
            Self {
                calls: Vec::new(),
                fail_at_call,
            }
        }
    }

    impl SceneRenderer for StubRenderer {
        fn render_at(&mut self, t: f64) -> NarravidResult<FrameRgba> {
            if self.fail_at_call == Some(self.calls.len()) {
                return Err(NarravidError::frame_render("stub failure"));
            }
            self.calls.push(t);
            let mut frame = FrameRgba::new(8, 8);
            frame.fill([0, 0, 0, 255]);
            Ok(frame)
        }
    }

    #[test]
    fn writes_exactly_ceil_duration_times_fps_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = StubRenderer::new(None);
        let written =
            capture_frames(&mut renderer, 3.0, Fps(30), dir.path(), &CancelToken::new()).unwrap();
        assert_eq!(written, 90);

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 90);
        names.sort();
        assert_eq!(names[0], "frame_00000.png");
        assert_eq!(names[89], "frame_00089.png");
    }

    #[test]
    fn calls_renderer_in_strictly_increasing_time_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = StubRenderer::new(None);
        capture_frames(&mut renderer, 1.0, Fps(24), dir.path(), &CancelToken::new()).unwrap();
        assert_eq!(renderer.calls.len(), 24);
        assert_eq!(renderer.calls[0], 0.0);
        assert!(renderer.calls.windows(2).all(|w| w[0] < w[1]));
        assert!((renderer.calls[23] - 23.0 / 24.0).abs() < 1e-12);
    }

    #[test]
    fn lexicographic_name_order_matches_temporal_order() {
        let names: Vec<String> = (0..200).map(frame_file_name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn first_frame_failure_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = StubRenderer::new(Some(45));
        let err = capture_frames(&mut renderer, 3.0, Fps(30), dir.path(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, NarravidError::FrameRender(_)));
        // No frames past the failure point were written.
        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 45);
    }

    #[test]
    fn zero_duration_is_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = StubRenderer::new(None);
        let err = capture_frames(&mut renderer, 0.0, Fps(30), dir.path(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, NarravidError::EmptyOutput(_)));
    }

    #[test]
    fn cancellation_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = StubRenderer::new(None);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = capture_frames(&mut renderer, 3.0, Fps(30), dir.path(), &cancel).unwrap_err();
        assert!(matches!(err, NarravidError::Canceled(_)));
        assert!(renderer.calls.is_empty());
    }

    #[test]
    fn missing_staging_directory_is_rejected() {
        let mut renderer = StubRenderer::new(None);
        let err = capture_frames(
            &mut renderer,
            1.0,
            Fps(30),
            Path::new("/definitely/not/here"),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, NarravidError::Validation(_)));
    }
}
