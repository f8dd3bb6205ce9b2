mod avatar;
mod raster;
mod text;

pub use avatar::{AvatarScene, AvatarSceneFactory};

use std::path::PathBuf;

use crate::foundation::{
    core::{Canvas, FrameRgba},
    error::{NarravidError, NarravidResult},
};
use crate::script::CaptionSegment;

/// The renderer capability the pipeline is built against: given a timestamp, produce
/// one frame reflecting caption and animation state at that timestamp.
///
/// `t` must be monotonically non-decreasing across calls on one instance; blink state
/// carries memory between frames, so call order matters. One instance serves exactly
/// one run.
pub trait SceneRenderer {
    fn render_at(&mut self, t: f64) -> NarravidResult<FrameRgba>;
}

/// Builds a fresh renderer for a run once the caption timeline is known.
pub trait RendererFactory: Send + Sync {
    fn create(&self, segments: &[CaptionSegment]) -> NarravidResult<Box<dyn SceneRenderer + Send>>;
}

/// Scene tuning. Every animation constant lives here with a documented default
/// rather than being hard-coded at the call site.
#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub canvas: Canvas,
    /// Deterministic seed for the blink trigger RNG.
    pub seed: u64,

    /// Probability per rendered frame that a blink starts (level resets to 1.0).
    /// Default 0.02, roughly one blink every 1.7 s at 30 fps.
    pub blink_trigger_probability: f64,
    /// How fast an in-progress blink decays back to open eyes, in level units per
    /// second. Default 6.0: a full blink lasts about 170 ms.
    pub blink_decay_per_sec: f64,

    /// Angular rate of the mouth oscillator, radians per second.
    pub mouth_rate: f64,
    /// Amplitude of the mouth oscillator before clamping to `[0, 1]`.
    pub mouth_amplitude: f64,
    /// Resting offset of the mouth oscillator.
    pub mouth_bias: f64,

    /// Horizontal body sway, cycles per second / peak pixels.
    pub sway_frequency_hz: f64,
    pub sway_amplitude_px: f64,
    /// Vertical head bob, cycles per second / peak pixels.
    pub bob_frequency_hz: f64,
    pub bob_amplitude_px: f64,

    /// Caption font. `None` scans a list of well-known system font locations; a path
    /// that cannot be loaded is a fatal `RenderInit` error.
    pub caption_font: Option<PathBuf>,
    pub caption_font_size: f32,

    pub background: [u8; 4],
    pub body_color: [u8; 4],
    pub skin_color: [u8; 4],
    pub eye_color: [u8; 4],
    pub mouth_color: [u8; 4],
    pub caption_band_color: [u8; 4],
    pub caption_text_color: [u8; 4],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            seed: 0,
            blink_trigger_probability: 0.02,
            blink_decay_per_sec: 6.0,
            mouth_rate: 12.0,
            mouth_amplitude: 0.6,
            mouth_bias: 0.4,
            sway_frequency_hz: 0.25,
            sway_amplitude_px: 12.0,
            bob_frequency_hz: 0.4,
            bob_amplitude_px: 6.0,
            caption_font: None,
            caption_font_size: 36.0,
            background: [24, 26, 34, 255],
            body_color: [52, 86, 140, 255],
            skin_color: [226, 186, 152, 255],
            eye_color: [30, 30, 36, 255],
            mouth_color: [120, 48, 52, 255],
            caption_band_color: [0, 0, 0, 176],
            caption_text_color: [240, 240, 240, 255],
        }
    }
}

impl SceneConfig {
    pub fn validate(&self) -> NarravidResult<()> {
        self.canvas.validate()?;
        if !(0.0..=1.0).contains(&self.blink_trigger_probability) {
            return Err(NarravidError::validation(
                "blink_trigger_probability must be within [0, 1]",
            ));
        }
        if self.blink_decay_per_sec < 0.0 {
            return Err(NarravidError::validation(
                "blink_decay_per_sec must be >= 0",
            ));
        }
        if self.caption_font_size <= 0.0 {
            return Err(NarravidError::validation("caption_font_size must be > 0"));
        }
        Ok(())
    }

    /// Mouth openness at `t`, a pure function of the timestamp: reproducible for any
    /// call history.
    pub fn mouth_openness(&self, t: f64) -> f64 {
        ((t * self.mouth_rate).sin() * self.mouth_amplitude + self.mouth_bias).clamp(0.0, 1.0)
    }

    /// Horizontal body sway offset in pixels at `t`.
    pub fn sway_offset(&self, t: f64) -> f64 {
        (std::f64::consts::TAU * self.sway_frequency_hz * t).sin() * self.sway_amplitude_px
    }

    /// Vertical head bob offset in pixels at `t`.
    pub fn bob_offset(&self, t: f64) -> f64 {
        (std::f64::consts::TAU * self.bob_frequency_hz * t).sin() * self.bob_amplitude_px
    }
}

/// The one piece of frame-to-frame animation memory: blink level in `[0, 1]`.
///
/// A blink triggers stochastically (deterministic under the seed), snaps the level to
/// 1.0, then decays linearly toward 0 with elapsed scene time.
#[derive(Clone, Debug)]
pub struct BlinkState {
    level: f64,
    rng: Rng64,
}

impl BlinkState {
    pub fn new(seed: u64) -> Self {
        Self {
            level: 0.0,
            rng: Rng64::new(seed),
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// Evolve by one rendered frame. `dt` is the scene time elapsed since the
    /// previous call (0 for the first frame).
    pub fn advance(&mut self, dt: f64, trigger_probability: f64, decay_per_sec: f64) -> f64 {
        if self.rng.next_f64_01() < trigger_probability {
            self.level = 1.0;
        } else {
            self.level = (self.level - decay_per_sec * dt.max(0.0)).max(0.0);
        }
        self.level
    }
}

/// SplitMix64, small and deterministic.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Rng64 {
    state: u64,
}

impl Rng64 {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    pub(crate) fn next_f64_01(&mut self) -> f64 {
        // 53 bits of precision.
        let v = self.next_u64() >> 11;
        (v as f64) * (1.0 / ((1u64 << 53) as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rng_is_deterministic() {
        let mut a = Rng64::new(123);
        let mut b = Rng64::new(123);
        for _ in 0..10 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn mouth_openness_is_pure_and_bounded() {
        let cfg = SceneConfig::default();
        let mut t = 0.0;
        while t < 10.0 {
            let v = cfg.mouth_openness(t);
            assert!((0.0..=1.0).contains(&v), "t = {t}, v = {v}");
            assert_eq!(v, cfg.mouth_openness(t));
            t += 0.013;
        }
    }

    #[test]
    fn blink_snaps_to_one_then_decays_monotonically() {
        let mut blink = BlinkState::new(7);
        let dt = 1.0 / 30.0;
        // Force a trigger, then let it decay with probability 0.
        blink.advance(dt, 1.0, 6.0);
        assert_eq!(blink.level(), 1.0);

        let mut prev = blink.level();
        for _ in 0..60 {
            let level = blink.advance(dt, 0.0, 6.0);
            assert!((0.0..=1.0).contains(&level));
            assert!(level <= prev, "decay must be monotone");
            prev = level;
        }
        assert_eq!(prev, 0.0, "must floor at zero");
    }

    #[test]
    fn blink_never_leaves_unit_interval_under_random_triggers() {
        let mut blink = BlinkState::new(42);
        let dt = 1.0 / 30.0;
        for _ in 0..2_000 {
            let level = blink.advance(dt, 0.05, 6.0);
            assert!((0.0..=1.0).contains(&level));
        }
    }

    #[test]
    fn blink_sequence_is_reproducible_for_a_seed() {
        let run = |seed| {
            let mut blink = BlinkState::new(seed);
            (0..200)
                .map(|_| blink.advance(1.0 / 30.0, 0.05, 6.0))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(9), run(9));
        assert_ne!(run(9), run(10));
    }

    #[test]
    fn config_validation_catches_bad_values() {
        let mut cfg = SceneConfig {
            blink_trigger_probability: 1.5,
            ..SceneConfig::default()
        };
        assert!(cfg.validate().is_err());
        cfg.blink_trigger_probability = 0.02;
        cfg.blink_decay_per_sec = -1.0;
        assert!(cfg.validate().is_err());
        cfg.blink_decay_per_sec = 6.0;
        assert!(cfg.validate().is_ok());
    }
}
