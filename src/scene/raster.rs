//! Minimal software rasterizer for the avatar scene: straight-alpha RGBA8 fills
//! with 8-bit blending.

use crate::foundation::core::FrameRgba;

pub(crate) fn blend_px(frame: &mut FrameRgba, x: i64, y: i64, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= i64::from(frame.width) || y >= i64::from(frame.height) {
        return;
    }
    let idx = ((y as usize) * (frame.width as usize) + (x as usize)) * 4;
    let dst = &mut frame.data[idx..idx + 4];

    let a = u16::from(color[3]);
    if a == 255 {
        dst.copy_from_slice(&color);
        return;
    }
    if a == 0 {
        return;
    }

    let inv = 255 - a;
    for c in 0..3 {
        let src = u16::from(color[c]);
        let old = u16::from(dst[c]);
        dst[c] = (mul_div255(src, a) + mul_div255(old, inv)).min(255) as u8;
    }
    let old_a = u16::from(dst[3]);
    dst[3] = (a + mul_div255(old_a, inv)).min(255) as u8;
}

pub(crate) fn fill_rect(frame: &mut FrameRgba, x0: i64, y0: i64, w: i64, h: i64, color: [u8; 4]) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            blend_px(frame, x, y, color);
        }
    }
}

/// Axis-aligned filled ellipse centered at `(cx, cy)` with radii `(rx, ry)`.
pub(crate) fn fill_ellipse(frame: &mut FrameRgba, cx: f64, cy: f64, rx: f64, ry: f64, color: [u8; 4]) {
    if rx <= 0.0 || ry <= 0.0 {
        return;
    }
    let x0 = (cx - rx).floor() as i64;
    let x1 = (cx + rx).ceil() as i64;
    let y0 = (cy - ry).floor() as i64;
    let y1 = (cy + ry).ceil() as i64;
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = (x as f64 + 0.5 - cx) / rx;
            let dy = (y as f64 + 0.5 - cy) / ry;
            if dx * dx + dy * dy <= 1.0 {
                blend_px(frame, x, y, color);
            }
        }
    }
}

/// Blend an 8-bit coverage bitmap (one byte per pixel) as `color`, used for glyphs.
pub(crate) fn blend_coverage(
    frame: &mut FrameRgba,
    x0: i64,
    y0: i64,
    coverage: &[u8],
    width: usize,
    height: usize,
    color: [u8; 4],
) {
    for (row, chunk) in coverage.chunks_exact(width).enumerate().take(height) {
        for (col, &cov) in chunk.iter().enumerate() {
            if cov == 0 {
                continue;
            }
            let a = mul_div255(u16::from(color[3]), u16::from(cov)) as u8;
            blend_px(
                frame,
                x0 + col as i64,
                y0 + row as i64,
                [color[0], color[1], color[2], a],
            );
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_blend_overwrites() {
        let mut frame = FrameRgba::new(2, 2);
        blend_px(&mut frame, 0, 0, [10, 20, 30, 255]);
        assert_eq!(&frame.data[0..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn half_alpha_blend_over_black() {
        let mut frame = FrameRgba::new(1, 1);
        frame.fill([0, 0, 0, 255]);
        blend_px(&mut frame, 0, 0, [255, 0, 0, 128]);
        assert_eq!(frame.data[0], 128);
        assert_eq!(frame.data[1], 0);
        assert_eq!(frame.data[3], 255);
    }

    #[test]
    fn out_of_bounds_is_ignored() {
        let mut frame = FrameRgba::new(2, 2);
        blend_px(&mut frame, -1, 0, [255, 255, 255, 255]);
        blend_px(&mut frame, 0, 5, [255, 255, 255, 255]);
        assert!(frame.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn ellipse_fills_center_not_corners() {
        let mut frame = FrameRgba::new(10, 10);
        fill_ellipse(&mut frame, 5.0, 5.0, 4.0, 4.0, [255, 255, 255, 255]);
        let px = |x: usize, y: usize| frame.data[(y * 10 + x) * 4];
        assert_eq!(px(5, 5), 255);
        assert_eq!(px(0, 0), 0);
        assert_eq!(px(9, 9), 0);
    }
}
