use crate::foundation::{
    core::FrameRgba,
    error::{NarravidError, NarravidResult},
};
use crate::scene::text::TextPainter;
use crate::scene::{BlinkState, RendererFactory, SceneConfig, SceneRenderer, raster};
use crate::script::{CaptionSegment, active_caption_index};

/// Built-in software renderer: a procedural talking avatar (head, blinking eyes,
/// oscillating mouth, swaying body) over a caption band.
///
/// All motion except blink is a pure function of `t`; blink is the single piece of
/// frame-to-frame state and is deterministic under the configured seed.
pub struct AvatarScene {
    cfg: SceneConfig,
    segments: Vec<CaptionSegment>,
    painter: TextPainter,
    blink: BlinkState,
    last_t: Option<f64>,
}

impl AvatarScene {
    /// Construct a renderer for one run. Loads the caption font up front; a font
    /// that cannot be loaded fails the whole run here rather than per frame.
    pub fn new(cfg: SceneConfig, segments: Vec<CaptionSegment>) -> NarravidResult<Self> {
        cfg.validate()?;
        let painter = TextPainter::load(cfg.caption_font.as_deref(), cfg.caption_font_size)?;
        let blink = BlinkState::new(cfg.seed);
        Ok(Self {
            cfg,
            segments,
            painter,
            blink,
            last_t: None,
        })
    }

    fn draw_avatar(&mut self, frame: &mut FrameRgba, t: f64, blink: f64) {
        let cfg = &self.cfg;
        let w = f64::from(cfg.canvas.width);
        let h = f64::from(cfg.canvas.height);
        let sway = cfg.sway_offset(t);
        let bob = cfg.bob_offset(t);

        // Torso.
        raster::fill_ellipse(
            frame,
            w * 0.5 + sway,
            h * 0.92,
            w * 0.16,
            h * 0.32,
            cfg.body_color,
        );

        // Head follows the sway at a reduced rate, plus its own bob.
        let head_cx = w * 0.5 + sway * 0.6;
        let head_cy = h * 0.38 + bob;
        let head_r = h * 0.17;
        raster::fill_ellipse(frame, head_cx, head_cy, head_r, head_r, cfg.skin_color);

        // Eyes close as blink level rises; a sliver stays visible at full blink.
        let eye_dx = head_r * 0.42;
        let eye_cy = head_cy - head_r * 0.18;
        let eye_rx = head_r * 0.13;
        let eye_ry = (head_r * 0.13 * (1.0 - blink)).max(head_r * 0.015);
        raster::fill_ellipse(frame, head_cx - eye_dx, eye_cy, eye_rx, eye_ry, cfg.eye_color);
        raster::fill_ellipse(frame, head_cx + eye_dx, eye_cy, eye_rx, eye_ry, cfg.eye_color);

        // Mouth opens with the deterministic oscillator.
        let openness = cfg.mouth_openness(t);
        let mouth_cy = head_cy + head_r * 0.45;
        let mouth_rx = head_r * 0.30;
        let mouth_ry = head_r * (0.04 + 0.24 * openness);
        raster::fill_ellipse(frame, head_cx, mouth_cy, mouth_rx, mouth_ry, cfg.mouth_color);
    }

    fn draw_caption(&mut self, frame: &mut FrameRgba, t: f64) {
        let Some(idx) = active_caption_index(&self.segments, t) else {
            return;
        };
        let text = self.segments[idx].text.clone();
        if text.is_empty() {
            return;
        }

        let w = f64::from(self.cfg.canvas.width);
        let h = f64::from(self.cfg.canvas.height);
        let band_top = h * 0.86;
        let band_h = h * 0.11;
        raster::fill_rect(
            frame,
            0,
            band_top as i64,
            w as i64,
            band_h as i64,
            self.cfg.caption_band_color,
        );

        let text_w = self.painter.measure(&text);
        let x = ((w - text_w) * 0.5).max(8.0);
        let y = band_top + (band_h - self.painter.line_height()) * 0.5;
        self.painter
            .draw(frame, x, y, &text, self.cfg.caption_text_color);
    }
}

impl SceneRenderer for AvatarScene {
    fn render_at(&mut self, t: f64) -> NarravidResult<FrameRgba> {
        if !t.is_finite() || t < 0.0 {
            return Err(NarravidError::validation(format!(
                "render timestamp must be finite and >= 0, got {t}"
            )));
        }
        if let Some(last) = self.last_t
            && t < last
        {
            return Err(NarravidError::validation(format!(
                "render timestamps must be monotonically non-decreasing ({t} < {last})"
            )));
        }
        let dt = self.last_t.map(|last| t - last).unwrap_or(0.0);
        self.last_t = Some(t);

        let blink = self.blink.advance(
            dt,
            self.cfg.blink_trigger_probability,
            self.cfg.blink_decay_per_sec,
        );

        let mut frame = FrameRgba::new(self.cfg.canvas.width, self.cfg.canvas.height);
        frame.fill(self.cfg.background);
        self.draw_avatar(&mut frame, t, blink);
        self.draw_caption(&mut frame, t);
        Ok(frame)
    }
}

/// Default [`RendererFactory`]: a fresh [`AvatarScene`] per run, no state shared
/// across runs.
#[derive(Clone, Debug)]
pub struct AvatarSceneFactory {
    pub config: SceneConfig,
}

impl AvatarSceneFactory {
    pub fn new(config: SceneConfig) -> Self {
        Self { config }
    }
}

impl RendererFactory for AvatarSceneFactory {
    fn create(&self, segments: &[CaptionSegment]) -> NarravidResult<Box<dyn SceneRenderer + Send>> {
        Ok(Box::new(AvatarScene::new(
            self.config.clone(),
            segments.to_vec(),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Canvas;
    use crate::script::segment;

    fn small_config() -> SceneConfig {
        SceneConfig {
            canvas: Canvas {
                width: 64,
                height: 36,
            },
            ..SceneConfig::default()
        }
    }

    fn try_scene(text: &str, duration: f64) -> Option<AvatarScene> {
        // Scene tests need a caption font; skip quietly on hosts without one.
        AvatarScene::new(small_config(), segment(text, duration)).ok()
    }

    #[test]
    fn renders_frames_of_canvas_size() {
        let Some(mut scene) = try_scene("Hello there. General narration.", 2.0) else {
            return;
        };
        let frame = scene.render_at(0.0).unwrap();
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 36);
        assert_eq!(frame.data.len(), 64 * 36 * 4);
        // Background fill means no transparent pixels anywhere.
        assert!(frame.data.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn rejects_backwards_timestamps() {
        let Some(mut scene) = try_scene("One. Two.", 2.0) else {
            return;
        };
        scene.render_at(0.5).unwrap();
        scene.render_at(0.5).unwrap();
        let err = scene.render_at(0.2).unwrap_err();
        assert!(matches!(err, NarravidError::Validation(_)));
    }

    #[test]
    fn rejects_non_finite_timestamps() {
        let Some(mut scene) = try_scene("One.", 1.0) else {
            return;
        };
        assert!(scene.render_at(f64::NAN).is_err());
        assert!(scene.render_at(-1.0).is_err());
    }

    #[test]
    fn timestamps_past_the_timeline_still_render() {
        // Capture may overshoot the audio tail by a frame; the scene must not fail,
        // it simply renders without a caption.
        let Some(mut scene) = try_scene("Tail. End.", 1.0) else {
            return;
        };
        assert!(scene.render_at(1.5).is_ok());
    }
}
