//! Caption text rendering via `fontdue` glyph rasterization with a per-glyph cache.

use std::collections::HashMap;
use std::path::Path;

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};

use crate::foundation::{
    core::FrameRgba,
    error::{NarravidError, NarravidResult},
};
use crate::scene::raster;

/// Well-known locations tried when no caption font is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

struct GlyphBitmap {
    width: usize,
    height: usize,
    coverage: Vec<u8>,
}

pub(crate) struct TextPainter {
    font: Font,
    size: f32,
    glyph_cache: HashMap<fontdue::layout::GlyphRasterConfig, GlyphBitmap>,
}

impl TextPainter {
    /// Load the caption font. Failure here is a `RenderInit` error: a missing font
    /// would corrupt every frame of the run the same way.
    pub(crate) fn load(path: Option<&Path>, size: f32) -> NarravidResult<Self> {
        match path {
            Some(p) => Self::from_file(p, size),
            None => {
                for candidate in SYSTEM_FONT_CANDIDATES {
                    let p = Path::new(candidate);
                    if p.exists() {
                        return Self::from_file(p, size);
                    }
                }
                Err(NarravidError::render_init(
                    "no caption font configured and no system font found; pass an explicit font path",
                ))
            }
        }
    }

    fn from_file(path: &Path, size: f32) -> NarravidResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            NarravidError::render_init(format!(
                "failed to read caption font '{}': {e}",
                path.display()
            ))
        })?;
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| {
            NarravidError::render_init(format!(
                "failed to parse caption font '{}': {e}",
                path.display()
            ))
        })?;
        Ok(Self {
            font,
            size,
            glyph_cache: HashMap::new(),
        })
    }

    /// Approximate advance width of `text` in pixels, for centering.
    pub(crate) fn measure(&self, text: &str) -> f64 {
        text.chars()
            .map(|ch| f64::from(self.font.metrics(ch, self.size).advance_width))
            .sum()
    }

    pub(crate) fn line_height(&self) -> f64 {
        f64::from(self.size) * 1.2
    }

    pub(crate) fn draw(
        &mut self,
        frame: &mut FrameRgba,
        x: f64,
        y: f64,
        text: &str,
        color: [u8; 4],
    ) {
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x: x as f32,
            y: y as f32,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(text, self.size, 0));

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let bitmap = self.glyph_cache.entry(glyph.key).or_insert_with(|| {
                let (_, coverage) = self.font.rasterize_config(glyph.key);
                GlyphBitmap {
                    width: glyph.width,
                    height: glyph.height,
                    coverage,
                }
            });
            raster::blend_coverage(
                frame,
                glyph.x.round() as i64,
                glyph.y.round() as i64,
                &bitmap.coverage,
                bitmap.width,
                bitmap.height,
                color,
            );
        }
    }
}
