use image::{Rgb, RgbImage};
use std::f32::consts::{FRAC_PI_2, TAU};

/// Remaps a rectangular frame into a clock-face layout.
///
/// The source x axis becomes the angle (0 at twelve o'clock, clockwise) and
/// the source y axis becomes the radius, bottom row at `inner` and top row at
/// `outer` (fractions of half the square side). Pixels outside that ring and
/// the padding around the square keep `background`.
pub fn polar_warp(src: &RgbImage, inner: f32, outer: f32, background: Rgb<u8>) -> RgbImage {
    let (width, height) = src.dimensions();
    let size = width.min(height);
    let center = size as f32 / 2.0;
    let inner_px = inner * center;
    let outer_px = outer * center;
    let span = outer_px - inner_px;

    let mut out = RgbImage::from_pixel(width, height, background);
    let offset_x = (width - size) / 2;
    let offset_y = (height - size) / 2;

    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 - center;
            let dy = y as f32 - center;
            let distance = (dx * dx + dy * dy).sqrt();
            if distance < inner_px || distance > outer_px {
                continue;
            }
            let norm = if span > 0.0 {
                ((distance - inner_px) / span).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let angle = (dy.atan2(dx) + FRAC_PI_2).rem_euclid(TAU);

            let sy = ((height as f32 * (1.0 - norm)) as u32).min(height - 1);
            let sx = ((angle / TAU * width as f32) as u32).min(width - 1);
            out.put_pixel(offset_x + x, offset_y + y, *src.get_pixel(sx, sy));
        }
    }
    out
}
