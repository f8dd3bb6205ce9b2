use crate::foundation::error::{NarravidError, NarravidResult};

/// Integer frames per second. The frame exporter and the ffmpeg image sequence
/// input both require a whole-number rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps(pub u32);

impl Fps {
    pub fn new(fps: u32) -> NarravidResult<Self> {
        if fps == 0 {
            return Err(NarravidError::validation("fps must be > 0"));
        }
        Ok(Self(fps))
    }

    pub fn validate(self) -> NarravidResult<()> {
        if self.0 == 0 {
            return Err(NarravidError::validation("fps must be > 0"));
        }
        Ok(())
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }

    /// Timestamp of frame `i`, in seconds. Frame `i` corresponds to `t = i / fps`.
    pub fn frame_time(self, i: u64) -> f64 {
        (i as f64) / self.as_f64()
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self(30)
    }
}

/// Number of frames needed to cover `duration` seconds at `fps`.
pub fn total_frames(duration: f64, fps: Fps) -> u64 {
    if !duration.is_finite() || duration <= 0.0 {
        return 0;
    }
    (duration * fps.as_f64()).ceil() as u64
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn validate(self) -> NarravidResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(NarravidError::validation("canvas width/height must be > 0"));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            // We target yuv420p output for maximum player compatibility.
            return Err(NarravidError::validation(
                "canvas width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Straight-alpha RGBA8 frame buffer, row-major, `width * height * 4` bytes.
#[derive(Clone, Debug)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRgba {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; (width as usize) * (height as usize) * 4],
        }
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_rejects_zero() {
        assert!(Fps::new(0).is_err());
        assert!(Fps::new(30).is_ok());
    }

    #[test]
    fn total_frames_rounds_up() {
        assert_eq!(total_frames(3.0, Fps(30)), 90);
        assert_eq!(total_frames(3.01, Fps(30)), 91);
        assert_eq!(total_frames(0.001, Fps(30)), 1);
        assert_eq!(total_frames(0.0, Fps(30)), 0);
        assert_eq!(total_frames(-1.0, Fps(30)), 0);
    }

    #[test]
    fn frame_time_maps_index_to_seconds() {
        let fps = Fps(30);
        assert_eq!(fps.frame_time(0), 0.0);
        assert!((fps.frame_time(30) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn canvas_rejects_odd_dimensions() {
        assert!(
            Canvas {
                width: 1281,
                height: 720
            }
            .validate()
            .is_err()
        );
        assert!(Canvas::default().validate().is_ok());
    }

    #[test]
    fn frame_buffer_is_sized_and_fillable() {
        let mut frame = FrameRgba::new(4, 2);
        assert_eq!(frame.data.len(), 32);
        frame.fill([1, 2, 3, 255]);
        assert_eq!(&frame.data[0..4], &[1, 2, 3, 255]);
        assert_eq!(&frame.data[28..32], &[1, 2, 3, 255]);
    }
}
