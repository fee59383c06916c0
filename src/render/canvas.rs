//! Solid-color raster primitives on an RGB buffer.
//!
//! Coordinates are integer pixel positions; everything is clipped to the
//! canvas. No primitive blends or anti-aliases: smoothing comes only from
//! supersampling the whole frame.

use image::{Rgb, RgbImage};

pub struct Canvas {
    img: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb<u8>) -> Self {
        Self {
            img: RgbImage::from_pixel(width, height, background),
        }
    }

    pub fn width(&self) -> i32 {
        self.img.width() as i32
    }

    pub fn height(&self) -> i32 {
        self.img.height() as i32
    }

    pub fn into_image(self) -> RgbImage {
        self.img
    }

    fn put(&mut self, x: i32, y: i32, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && x < self.width() && y < self.height() {
            self.img.put_pixel(x as u32, y as u32, color);
        }
    }

    fn span(&mut self, y: i32, x0: i32, x1: i32, color: Rgb<u8>) {
        if y < 0 || y >= self.height() {
            return;
        }
        let x0 = x0.max(0);
        let x1 = x1.min(self.width() - 1);
        for x in x0..=x1 {
            self.img.put_pixel(x as u32, y as u32, color);
        }
    }

    /// Filled axis-aligned rectangle; both corners inclusive, in any order.
    pub fn fill_rect(&mut self, (ax, ay): (i32, i32), (bx, by): (i32, i32), color: Rgb<u8>) {
        let (x0, x1) = (ax.min(bx), ax.max(bx));
        let (y0, y1) = (ay.min(by), ay.max(by));
        for y in y0.max(0)..=y1.min(self.height() - 1) {
            self.span(y, x0, x1, color);
        }
    }

    /// Filled disc of every pixel within `radius` of the center. A radius of
    /// zero or less paints nothing.
    pub fn fill_circle(&mut self, (cx, cy): (i32, i32), radius: i32, color: Rgb<u8>) {
        if radius <= 0 {
            return;
        }
        let r2 = (radius as i64) * (radius as i64);
        for dy in -radius..=radius {
            let rem = r2 - (dy as i64) * (dy as i64);
            let half = (rem as f64).sqrt() as i32;
            self.span(cy + dy, cx - half, cx + half, color);
        }
    }

    /// Straight stroke with round caps, `thickness` pixels wide.
    pub fn draw_line(&mut self, a: (i32, i32), b: (i32, i32), thickness: u32, color: Rgb<u8>) {
        let half = thickness.max(1) as f32 / 2.0;
        if thickness <= 1 {
            self.thin_line(a, b, color);
            return;
        }
        let pad = half.ceil() as i32;
        let x0 = (a.0.min(b.0) - pad).max(0);
        let x1 = (a.0.max(b.0) + pad).min(self.width() - 1);
        let y0 = (a.1.min(b.1) - pad).max(0);
        let y1 = (a.1.max(b.1) + pad).min(self.height() - 1);

        let (ax, ay) = (a.0 as f32, a.1 as f32);
        let (dx, dy) = ((b.0 - a.0) as f32, (b.1 - a.1) as f32);
        let len2 = dx * dx + dy * dy;
        let limit = half * half;

        for y in y0..=y1 {
            for x in x0..=x1 {
                let (px, py) = (x as f32 - ax, y as f32 - ay);
                let t = if len2 > 0.0 {
                    ((px * dx + py * dy) / len2).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let (ex, ey) = (px - t * dx, py - t * dy);
                if ex * ex + ey * ey <= limit {
                    self.img.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }

    // Bresenham
    fn thin_line(&mut self, (mut x, mut y): (i32, i32), (bx, by): (i32, i32), color: Rgb<u8>) {
        let dx = (bx - x).abs();
        let dy = -(by - y).abs();
        let sx = if x < bx { 1 } else { -1 };
        let sy = if y < by { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put(x, y, color);
            if x == bx && y == by {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Filled polygon using the even-odd rule, sampled at pixel centers.
    pub fn fill_polygon(&mut self, points: &[(i32, i32)], color: Rgb<u8>) {
        if points.len() < 3 {
            return;
        }
        let y_min = points.iter().map(|p| p.1).min().unwrap_or(0).max(0);
        let y_max = points
            .iter()
            .map(|p| p.1)
            .max()
            .unwrap_or(0)
            .min(self.height() - 1);

        let mut crossings: Vec<f32> = Vec::with_capacity(points.len());
        for y in y_min..=y_max {
            let sample_y = y as f32 + 0.5;
            crossings.clear();
            for (i, &(x0, y0)) in points.iter().enumerate() {
                let (x1, y1) = points[(i + 1) % points.len()];
                let (fy0, fy1) = (y0 as f32, y1 as f32);
                if (fy0 <= sample_y && fy1 > sample_y) || (fy1 <= sample_y && fy0 > sample_y) {
                    let t = (sample_y - fy0) / (fy1 - fy0);
                    crossings.push(x0 as f32 + t * (x1 - x0) as f32);
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for pair in crossings.chunks_exact(2) {
                let start = (pair[0] - 0.5).ceil() as i32;
                let end = (pair[1] - 0.5).floor() as i32;
                if end >= start {
                    self.span(y, start, end, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: Rgb<u8> = Rgb([0, 0, 0]);
    const FG: Rgb<u8> = Rgb([255, 0, 0]);

    fn count(img: &RgbImage, color: Rgb<u8>) -> usize {
        img.pixels().filter(|&&p| p == color).count()
    }

    #[test]
    fn rect_is_inclusive_and_clipped() {
        let mut c = Canvas::new(10, 10, BG);
        c.fill_rect((2, 3), (4, 5), FG);
        c.fill_rect((8, 8), (20, 20), FG);
        let img = c.into_image();
        assert_eq!(count(&img, FG), 9 + 4);
        assert_eq!(*img.get_pixel(2, 3), FG);
        assert_eq!(*img.get_pixel(4, 5), FG);
        assert_eq!(*img.get_pixel(5, 5), BG);
    }

    #[test]
    fn rect_below_canvas_paints_nothing() {
        let mut c = Canvas::new(10, 10, BG);
        c.fill_rect((0, 10), (9, 10), FG);
        assert_eq!(count(&c.into_image(), FG), 0);
    }

    #[test]
    fn circle_is_symmetric_and_zero_radius_is_empty() {
        let mut c = Canvas::new(21, 21, BG);
        c.fill_circle((10, 10), 0, FG);
        assert_eq!(count(&c.img, FG), 0);
        c.fill_circle((10, 10), 5, FG);
        let img = c.into_image();
        assert_eq!(*img.get_pixel(15, 10), FG);
        assert_eq!(*img.get_pixel(5, 10), FG);
        assert_eq!(*img.get_pixel(10, 15), FG);
        assert_eq!(*img.get_pixel(16, 10), BG);
        assert_eq!(*img.get_pixel(14, 14), BG);
    }

    #[test]
    fn thick_line_covers_its_width() {
        let mut c = Canvas::new(20, 20, BG);
        c.draw_line((2, 10), (17, 10), 4, FG);
        let img = c.into_image();
        for x in 2..=17 {
            assert_eq!(*img.get_pixel(x, 8), FG);
            assert_eq!(*img.get_pixel(x, 12), FG);
            assert_eq!(*img.get_pixel(x, 13), BG);
        }
    }

    #[test]
    fn thin_line_hits_both_endpoints() {
        let mut c = Canvas::new(10, 10, BG);
        c.draw_line((0, 0), (9, 6), 1, FG);
        let img = c.into_image();
        assert_eq!(*img.get_pixel(0, 0), FG);
        assert_eq!(*img.get_pixel(9, 6), FG);
    }

    #[test]
    fn polygon_fills_interior_only() {
        let mut c = Canvas::new(10, 10, BG);
        c.fill_polygon(&[(0, 0), (10, 0), (10, 10), (0, 10)], FG);
        assert_eq!(count(&c.img, FG), 100);

        let mut c = Canvas::new(10, 10, BG);
        c.fill_polygon(&[(0, 10), (5, 0), (10, 10)], FG);
        let img = c.into_image();
        assert_eq!(*img.get_pixel(5, 8), FG);
        assert_eq!(*img.get_pixel(0, 1), BG);
        assert_eq!(*img.get_pixel(9, 1), BG);
    }
}
