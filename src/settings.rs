use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{VisError, VisResult};

/// Which acoustic feature drives the frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visualization {
    Volume,
    Spectrum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Bar,
    Point,
    Line,
}

/// Resolved style × variant, picked once per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleKind {
    /// Volume mode: a disc (or ring) scaled by loudness.
    Disc,
    BarSimple,
    BarLcd,
    PointCircle,
    PointSquare,
    PointDonut,
    LineSimple,
    LineFilled,
}

impl StyleKind {
    pub fn resolve(visualization: Visualization, style: Style, variant: &str) -> VisResult<Self> {
        if visualization == Visualization::Volume {
            return Ok(StyleKind::Disc);
        }
        let kind = match (style, variant) {
            (Style::Bar, "simple") => StyleKind::BarSimple,
            (Style::Bar, "lcd") => StyleKind::BarLcd,
            (Style::Point, "circle") => StyleKind::PointCircle,
            (Style::Point, "square") => StyleKind::PointSquare,
            (Style::Point, "donut") => StyleKind::PointDonut,
            (Style::Line, "simple") => StyleKind::LineSimple,
            (Style::Line, "filled") => StyleKind::LineFilled,
            _ => {
                return Err(VisError::configuration(format!(
                    "unsupported style variant '{}' for style {:?}",
                    variant, style
                )))
            }
        };
        Ok(kind)
    }
}

/// An opaque RGB color, written as `#rrggbb` or `#rgb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 3]);

impl Color {
    pub fn rgb(self) -> image::Rgb<u8> {
        image::Rgb(self.0)
    }
}

impl FromStr for Color {
    type Err = VisError;

    fn from_str(s: &str) -> VisResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        let bad = || VisError::configuration(format!("invalid color '{}'", s));
        if !hex.is_ascii() {
            return Err(bad());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| bad());
        match hex.len() {
            6 => Ok(Color([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            ])),
            3 => {
                let mut out = [0u8; 3];
                for (i, c) in hex.chars().enumerate() {
                    let v = channel(&c.to_string())?;
                    out[i] = v * 17;
                }
                Ok(Color(out))
            }
            _ => Err(bad()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = VisError;

    fn try_from(value: String) -> VisResult<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

/// Immutable job configuration shared read-only by every stage and worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualizationSettings {
    pub visualization: Visualization,
    pub style: Style,
    pub style_variant: String,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    /// Start and optional end of the selected range, in seconds.
    pub start_end: (f64, Option<f64>),
    pub smoothing: bool,
    pub anti_aliasing: bool,
    pub polar_warp: bool,
    pub bins: usize,
    /// Fraction of each bin slot that is painted.
    pub bin_width: f32,
    pub line_thickness: u32,
    pub min_max_frequency: (f32, f32),
    pub color: Color,
    pub background_color: Color,
    /// Fractions of half the shorter canvas side.
    pub inner_outer_radius: (f32, f32),
    pub file_name: Option<String>,
}

impl Default for VisualizationSettings {
    fn default() -> Self {
        Self {
            visualization: Visualization::Spectrum,
            style: Style::Line,
            style_variant: "filled".into(),
            width: 854,
            height: 480,
            framerate: 30,
            start_end: (0.0, None),
            smoothing: true,
            anti_aliasing: true,
            polar_warp: false,
            bins: 64,
            bin_width: 0.75,
            line_thickness: 10,
            min_max_frequency: (0.0, 2000.0),
            color: Color([0xff, 0x00, 0x00]),
            background_color: Color([0x01, 0x02, 0x04]),
            inner_outer_radius: (0.0, 1.0),
            file_name: None,
        }
    }
}

impl VisualizationSettings {
    /// Checks every invariant and resolves the style tag used by the renderer.
    pub fn validate(&self) -> VisResult<StyleKind> {
        if self.width == 0 || self.height == 0 {
            return Err(VisError::configuration("width/height must be non-zero"));
        }
        if self.framerate == 0 {
            return Err(VisError::configuration("frame rate must be positive"));
        }
        if self.bins == 0 {
            return Err(VisError::configuration("bin count must be at least 1"));
        }
        let (min_freq, max_freq) = self.min_max_frequency;
        if !min_freq.is_finite() || !max_freq.is_finite() || min_freq < 0.0 {
            return Err(VisError::configuration(format!(
                "invalid frequency band [{}, {}]",
                min_freq, max_freq
            )));
        }
        if min_freq > max_freq {
            return Err(VisError::configuration(format!(
                "min frequency {} exceeds max frequency {}",
                min_freq, max_freq
            )));
        }
        let (inner, outer) = self.inner_outer_radius;
        if !(0.0..=1.0).contains(&inner) || !(0.0..=1.0).contains(&outer) {
            return Err(VisError::configuration(format!(
                "radius fractions must lie in [0, 1], got [{}, {}]",
                inner, outer
            )));
        }
        if inner > outer {
            return Err(VisError::configuration(format!(
                "inner radius {} exceeds outer radius {}",
                inner, outer
            )));
        }
        if !(self.bin_width > 0.0 && self.bin_width <= 1.0) {
            return Err(VisError::configuration(format!(
                "bin width must lie in (0, 1], got {}",
                self.bin_width
            )));
        }
        if self.line_thickness == 0 {
            return Err(VisError::configuration("line thickness must be at least 1"));
        }
        let (start, end) = self.start_end;
        if !start.is_finite() || start < 0.0 {
            return Err(VisError::configuration(format!("invalid start time {}", start)));
        }
        if let Some(end) = end {
            if !end.is_finite() || end <= start {
                return Err(VisError::configuration(format!(
                    "end time {} must be after start time {}",
                    end, start
                )));
            }
        }
        StyleKind::resolve(self.visualization, self.style, &self.style_variant)
    }

    /// Samples per output frame, rounded down.
    pub fn samples_per_frame(&self, sample_rate: u32) -> VisResult<usize> {
        if self.framerate == 0 {
            return Err(VisError::configuration("frame rate must be positive"));
        }
        let window = (sample_rate / self.framerate) as usize;
        if window == 0 {
            return Err(VisError::configuration(format!(
                "frame rate {} exceeds sample rate {}",
                self.framerate, sample_rate
            )));
        }
        Ok(window)
    }

    pub fn output_file_name(&self) -> String {
        let stem = self
            .file_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("video");
        format!("{}.mp4", stem)
    }
}
