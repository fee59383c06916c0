//! Per-style drawing of one feature vector onto a canvas.
//!
//! All geometry is computed against the canvas passed in, which is already
//! doubled when supersampling.

use image::Rgb;

use super::canvas::Canvas;
use crate::settings::StyleKind;

/// Drawing parameters derived from the settings once per job.
#[derive(Debug, Clone, Copy)]
pub struct StyleParams {
    pub kind: StyleKind,
    pub color: Rgb<u8>,
    pub background: Rgb<u8>,
    pub bin_width: f32,
    /// Stroke width at canvas resolution.
    pub line_thickness: u32,
    pub inner_radius: f32,
    pub outer_radius: f32,
    /// Close line shapes back to the first point instead of the baseline.
    pub wrap_around: bool,
}

pub fn draw(canvas: &mut Canvas, params: &StyleParams, values: &[f32]) {
    match params.kind {
        StyleKind::Disc => draw_disc(canvas, params, values.first().copied().unwrap_or(0.0)),
        StyleKind::BarSimple => draw_bars(canvas, params, values),
        StyleKind::BarLcd => draw_lcd(canvas, params, values),
        StyleKind::PointCircle => draw_points(canvas, params, values, false),
        StyleKind::PointDonut => draw_points(canvas, params, values, true),
        StyleKind::PointSquare => draw_squares(canvas, params, values),
        StyleKind::LineSimple => draw_polyline(canvas, params, values),
        StyleKind::LineFilled => draw_filled_line(canvas, params, values),
    }
}

fn draw_disc(canvas: &mut Canvas, p: &StyleParams, value: f32) {
    let smallest = canvas.width().min(canvas.height()) as f32;
    let fraction = p.inner_radius + value * (p.outer_radius - p.inner_radius);
    let radius = (smallest / 2.0 * fraction) as i32;
    let center = (canvas.width() / 2, canvas.height() / 2);

    canvas.fill_circle(center, radius, p.color);
    if p.inner_radius > 0.0 {
        let hole = (smallest / 2.0 * p.inner_radius) as i32;
        canvas.fill_circle(center, hole, p.background);
    }
}

/// Horizontal extent of bin `i`: slot start plus the centered painted part.
struct Slots {
    slot: f32,
    offset: f32,
}

impl Slots {
    fn new(canvas: &Canvas, bins: usize, bin_width: f32) -> Self {
        let slot = canvas.width() as f32 / bins.max(1) as f32;
        Self {
            slot,
            offset: slot * (1.0 - bin_width) / 2.0,
        }
    }

    fn span(&self, i: usize) -> (i32, i32) {
        let x1 = (self.slot * i as f32 + self.offset) as i32;
        let x2 = (self.slot * (i + 1) as f32 - self.offset) as i32;
        (x1, x2)
    }

    fn painted(&self) -> i32 {
        (self.slot - 2.0 * self.offset) as i32
    }
}

fn draw_bars(canvas: &mut Canvas, p: &StyleParams, values: &[f32]) {
    let height = canvas.height();
    let slots = Slots::new(canvas, values.len(), p.bin_width);
    for (i, &v) in values.iter().enumerate() {
        let bar_height = (height as f32 * v) as i32;
        let (x1, x2) = slots.span(i);
        canvas.fill_rect((x1, height - bar_height), (x2, height), p.color);
    }
}

fn draw_lcd(canvas: &mut Canvas, p: &StyleParams, values: &[f32]) {
    let height = canvas.height();
    let slots = Slots::new(canvas, values.len(), p.bin_width);
    let row_height = slots.painted().max(1);
    let max_rows = height as f32 / row_height as f32;
    for (i, &v) in values.iter().enumerate() {
        let rows = (v * max_rows).round() as i32;
        let (x1, x2) = slots.span(i);
        for row in 0..rows {
            // Lower half of each row is lit, the upper half is the gap.
            let y1 = height - (row_height as f32 * (row as f32 + 0.5)) as i32 + 1;
            let y2 = height - row_height * row;
            canvas.fill_rect((x1, y1), (x2, y2), p.color);
        }
    }
}

fn draw_points(canvas: &mut Canvas, p: &StyleParams, values: &[f32], donut: bool) {
    let (width, height) = (canvas.width() as f32, canvas.height() as f32);
    let slot = width / values.len().max(1) as f32;
    let radius = slot / 2.0;
    let dot = (radius * p.bin_width) as i32;
    let hole = (radius * p.bin_width / 2.0) as i32;
    for (i, &v) in values.iter().enumerate() {
        let x = (slot * i as f32 + radius) as i32;
        let lift = (height * v - radius) as i32;
        let center = (x, height as i32 - lift);
        canvas.fill_circle(center, dot, p.color);
        if donut {
            canvas.fill_circle(center, hole, p.background);
        }
    }
}

fn draw_squares(canvas: &mut Canvas, p: &StyleParams, values: &[f32]) {
    let height = canvas.height();
    let slots = Slots::new(canvas, values.len(), p.bin_width);
    let side = slots.painted();
    for (i, &v) in values.iter().enumerate() {
        let top = height - (height as f32 * v) as i32;
        let (x1, x2) = slots.span(i);
        canvas.fill_rect((x1, top), (x2, top + side), p.color);
    }
}

/// Sample points of a line style plus its closing point.
fn line_points(canvas: &Canvas, values: &[f32], wrap_around: bool) -> Vec<(i32, i32)> {
    let (width, height) = (canvas.width() as f32, canvas.height());
    let slot = width / values.len().max(1) as f32;
    let y_of = |v: f32| (height as f32 - height as f32 * v) as i32;

    let mut points: Vec<(i32, i32)> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| ((slot * i as f32) as i32, y_of(v)))
        .collect();
    let closing_y = match (wrap_around, values.first()) {
        (true, Some(&first)) => y_of(first),
        _ => height,
    };
    points.push(((slot * values.len() as f32) as i32, closing_y));
    points
}

fn draw_polyline(canvas: &mut Canvas, p: &StyleParams, values: &[f32]) {
    let points = line_points(canvas, values, p.wrap_around);
    for pair in points.windows(2) {
        canvas.draw_line(pair[0], pair[1], p.line_thickness, p.color);
    }
}

fn draw_filled_line(canvas: &mut Canvas, p: &StyleParams, values: &[f32]) {
    if values.is_empty() {
        return;
    }
    let height = canvas.height();
    let mut points = line_points(canvas, values, p.wrap_around);
    points.truncate(values.len());
    let first_x = points[0].0;
    let last_x = points[points.len() - 1].0;
    points.push((last_x, height));
    points.push((first_x, height));
    canvas.fill_polygon(&points, p.color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    const BG: Rgb<u8> = Rgb([1, 2, 4]);
    const FG: Rgb<u8> = Rgb([255, 0, 0]);

    fn params(kind: StyleKind) -> StyleParams {
        StyleParams {
            kind,
            color: FG,
            background: BG,
            bin_width: 1.0,
            line_thickness: 2,
            inner_radius: 0.0,
            outer_radius: 1.0,
            wrap_around: false,
        }
    }

    fn render(kind: StyleKind, values: &[f32], w: u32, h: u32) -> RgbImage {
        render_with(params(kind), values, w, h)
    }

    fn render_with(p: StyleParams, values: &[f32], w: u32, h: u32) -> RgbImage {
        let mut c = Canvas::new(w, h, BG);
        draw(&mut c, &p, values);
        c.into_image()
    }

    fn lit(img: &RgbImage) -> usize {
        img.pixels().filter(|&&p| p == FG).count()
    }

    #[test]
    fn silent_disc_is_blank() {
        let img = render(StyleKind::Disc, &[0.0], 64, 48);
        assert_eq!(lit(&img), 0);
    }

    #[test]
    fn full_disc_touches_shorter_edges() {
        let img = render(StyleKind::Disc, &[1.0], 64, 48);
        assert_eq!(*img.get_pixel(32, 0), FG);
        assert_eq!(*img.get_pixel(32, 47), FG);
        assert_eq!(*img.get_pixel(0, 24), BG);
    }

    #[test]
    fn ring_keeps_a_background_hole() {
        let p = StyleParams {
            inner_radius: 0.5,
            ..params(StyleKind::Disc)
        };
        let img = render_with(p, &[1.0], 40, 40);
        assert_eq!(*img.get_pixel(20, 20), BG);
        assert_eq!(*img.get_pixel(20, 2), FG);
        // At silence the disc and hole coincide.
        assert_eq!(lit(&render_with(p, &[0.0], 40, 40)), 0);
    }

    #[test]
    fn bars_grow_from_the_bottom() {
        let img = render(StyleKind::BarSimple, &[0.0, 0.5, 1.0, 0.25], 40, 20);
        // Slot 1 spans x 10..=20, half height.
        assert_eq!(*img.get_pixel(15, 19), FG);
        assert_eq!(*img.get_pixel(15, 10), FG);
        assert_eq!(*img.get_pixel(15, 9), BG);
        assert_eq!(*img.get_pixel(25, 0), FG);
        assert_eq!(*img.get_pixel(5, 19), BG);
    }

    #[test]
    fn bar_width_fraction_centers_the_bar() {
        let p = StyleParams {
            bin_width: 0.5,
            ..params(StyleKind::BarSimple)
        };
        let img = render_with(p, &[1.0], 40, 10);
        assert_eq!(*img.get_pixel(9, 5), BG);
        assert_eq!(*img.get_pixel(10, 5), FG);
        assert_eq!(*img.get_pixel(30, 5), FG);
        assert_eq!(*img.get_pixel(31, 5), BG);
    }

    #[test]
    fn lcd_lights_discrete_rows() {
        // Slot 10 px wide gives 10 px rows, four rows fit in 40 px.
        let img = render(StyleKind::BarLcd, &[0.5], 10, 40);
        let column: Vec<bool> = (0..40).map(|y| *img.get_pixel(5, y) == FG).collect();
        let lit_rows = column.iter().filter(|&&b| b).count();
        // Rows cover y 36..=39 (clipped at the bottom edge) and 26..=30.
        assert_eq!(lit_rows, 4 + 5);
        assert!(column[39]);
        assert!(!column[0]);
        // Gap between the two lit rows.
        assert!(!column[31]);
    }

    #[test]
    fn point_circle_rides_the_value() {
        let img = render(StyleKind::PointCircle, &[0.5], 20, 100);
        // Radius 10, center lifted by 50 - 10 = 40 from the bottom.
        assert_eq!(*img.get_pixel(10, 60), FG);
        assert_eq!(*img.get_pixel(10, 45), BG);
    }

    #[test]
    fn donut_has_a_hole() {
        let img = render(StyleKind::PointDonut, &[0.5], 20, 100);
        assert_eq!(*img.get_pixel(10, 60), BG);
        assert_eq!(*img.get_pixel(10, 68), FG);
    }

    #[test]
    fn square_point_is_as_tall_as_wide() {
        let img = render(StyleKind::PointSquare, &[0.5], 10, 100);
        let rows = (0..100).filter(|&y| *img.get_pixel(5, y) == FG).count();
        assert_eq!(rows, 11);
        assert_eq!(*img.get_pixel(5, 50), FG);
        assert_eq!(*img.get_pixel(5, 61), BG);
    }

    #[test]
    fn filled_line_closes_against_baseline() {
        let img = render(StyleKind::LineFilled, &[1.0, 1.0, 1.0, 1.0], 40, 20);
        assert_eq!(*img.get_pixel(0, 10), FG);
        assert_eq!(*img.get_pixel(29, 10), FG);
        // Last sample sits at x = 30, the polygon stops there.
        assert_eq!(*img.get_pixel(35, 10), BG);
    }

    #[test]
    fn simple_line_drops_to_baseline_unless_wrapping() {
        let values = [0.5, 0.5];
        let img = render(StyleKind::LineSimple, &values, 40, 40);
        assert_eq!(*img.get_pixel(10, 20), FG);
        assert_eq!(*img.get_pixel(39, 39), FG);

        let p = StyleParams {
            wrap_around: true,
            ..params(StyleKind::LineSimple)
        };
        let img = render_with(p, &values, 40, 40);
        assert_eq!(*img.get_pixel(39, 20), FG);
        assert_eq!(*img.get_pixel(39, 39), BG);
    }
}
