use image::imageops;
use image::RgbImage;

use super::canvas::Canvas;
use super::polar::polar_warp;
use super::style::{self, StyleParams};
use crate::error::{VisError, VisResult};
use crate::settings::{StyleKind, Visualization, VisualizationSettings};

/// Supersampling factor used for anti-aliasing.
const SUPERSAMPLE: u32 = 2;

/// Turns one feature vector into one frame.
///
/// Built once per job from validated settings and shared by reference with
/// every worker; rendering never mutates it.
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    params: StyleParams,
    width: u32,
    height: u32,
    canvas_width: u32,
    canvas_height: u32,
    anti_aliasing: bool,
    polar_warp: bool,
    expected_len: usize,
}

impl FrameRenderer {
    pub fn new(settings: &VisualizationSettings) -> VisResult<Self> {
        let kind = settings.validate()?;
        let scale = if settings.anti_aliasing { SUPERSAMPLE } else { 1 };
        let canvas_width = settings
            .width
            .checked_mul(scale)
            .ok_or_else(|| VisError::configuration("canvas width overflows"))?;
        let canvas_height = settings
            .height
            .checked_mul(scale)
            .ok_or_else(|| VisError::configuration("canvas height overflows"))?;

        let line_thickness = settings
            .line_thickness
            .checked_mul(scale)
            .ok_or_else(|| VisError::configuration("line thickness overflows"))?;

        let (inner_radius, outer_radius) = settings.inner_outer_radius;
        let params = StyleParams {
            kind,
            color: settings.color.rgb(),
            background: settings.background_color.rgb(),
            bin_width: settings.bin_width,
            line_thickness,
            inner_radius,
            outer_radius,
            wrap_around: settings.polar_warp,
        };
        let expected_len = match settings.visualization {
            Visualization::Volume => 1,
            Visualization::Spectrum => settings.bins,
        };

        log::debug!(
            "Frame renderer: {:?}, canvas {}x{}, output {}x{}",
            kind,
            canvas_width,
            canvas_height,
            settings.width,
            settings.height
        );

        Ok(Self {
            params,
            width: settings.width,
            height: settings.height,
            canvas_width,
            canvas_height,
            anti_aliasing: settings.anti_aliasing,
            polar_warp: settings.polar_warp,
            expected_len,
        })
    }

    pub fn kind(&self) -> StyleKind {
        self.params.kind
    }

    /// Output dimensions, independent of supersampling.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn render(&self, values: &[f32]) -> VisResult<RgbImage> {
        if values.len() != self.expected_len {
            return Err(VisError::analysis(format!(
                "feature vector has {} components, renderer expects {}",
                values.len(),
                self.expected_len
            )));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(VisError::analysis(format!("feature value {} is not finite", bad)));
        }

        let mut canvas = Canvas::new(self.canvas_width, self.canvas_height, self.params.background);
        style::draw(&mut canvas, &self.params, values);
        let mut img = canvas.into_image();

        // Volume frames are already radial.
        if self.polar_warp && self.params.kind != StyleKind::Disc {
            img = polar_warp(
                &img,
                self.params.inner_radius,
                self.params.outer_radius,
                self.params.background,
            );
        }
        // Exact 2x area average: each output pixel is its own 2x2 block.
        if self.anti_aliasing {
            img = imageops::thumbnail(&img, self.width, self.height);
        }
        Ok(img)
    }
}
