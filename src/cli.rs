use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use audiovis::{Color, Style, Visualization, VisualizationSettings};

#[derive(Parser, Debug)]
#[command(name = "audiovis", about = "Render audio-driven visualization videos", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a full video from an audio file
    Render {
        /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
        input: PathBuf,

        /// Output video file [default: <fileName>.mp4]
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,

        /// Worker threads for frame rendering
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Write frames to this (empty) directory and keep them
        #[arg(long)]
        keep_frames: Option<PathBuf>,
    },

    /// Render only the first frame to a PNG
    Preview {
        /// Audio file to sample; a built-in reference signal when omitted
        input: Option<PathBuf>,

        /// Output image
        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args, Debug, Default)]
pub struct CommonArgs {
    /// Settings JSON file (same keys as the web request payload)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// TOML config file [default: auto-detect audiovis.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub style: StyleArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum VisualizationArg {
    Volume,
    Spectrum,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StyleArg {
    Bar,
    Point,
    Line,
}

/// Per-field overrides; anything left unset keeps the value from the
/// settings file, config file or defaults.
#[derive(Args, Debug, Default)]
pub struct StyleArgs {
    #[arg(long, value_enum)]
    pub visualization: Option<VisualizationArg>,

    #[arg(long, value_enum)]
    pub style: Option<StyleArg>,

    /// Style variant (bar: simple|lcd, point: circle|square|donut, line: simple|filled)
    #[arg(long)]
    pub variant: Option<String>,

    /// Video width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Video height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Start of the selection in seconds
    #[arg(long)]
    pub start: Option<f64>,

    /// End of the selection in seconds
    #[arg(long)]
    pub end: Option<f64>,

    /// Number of spectrum bins
    #[arg(long)]
    pub bins: Option<usize>,

    /// Painted fraction of each bin slot (0-1]
    #[arg(long)]
    pub bin_width: Option<f32>,

    /// Stroke width for line styles
    #[arg(long)]
    pub line_thickness: Option<u32>,

    #[arg(long)]
    pub min_freq: Option<f32>,

    #[arg(long)]
    pub max_freq: Option<f32>,

    /// Inner radius fraction for volume discs and polar warp
    #[arg(long)]
    pub inner_radius: Option<f32>,

    /// Outer radius fraction for volume discs and polar warp
    #[arg(long)]
    pub outer_radius: Option<f32>,

    /// Foreground color (#rrggbb)
    #[arg(long)]
    pub color: Option<Color>,

    /// Background color (#rrggbb)
    #[arg(long)]
    pub background: Option<Color>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub smoothing: Option<bool>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub anti_aliasing: Option<bool>,

    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub polar_warp: Option<bool>,

    /// Output name without extension
    #[arg(long)]
    pub file_name: Option<String>,
}

impl StyleArgs {
    pub fn apply(&self, s: &mut VisualizationSettings) {
        if let Some(v) = self.visualization {
            s.visualization = match v {
                VisualizationArg::Volume => Visualization::Volume,
                VisualizationArg::Spectrum => Visualization::Spectrum,
            };
        }
        if let Some(v) = self.style {
            s.style = match v {
                StyleArg::Bar => Style::Bar,
                StyleArg::Point => Style::Point,
                StyleArg::Line => Style::Line,
            };
        }
        if let Some(ref v) = self.variant { s.style_variant = v.clone(); }
        if let Some(v) = self.width { s.width = v; }
        if let Some(v) = self.height { s.height = v; }
        if let Some(v) = self.fps { s.framerate = v; }
        if let Some(v) = self.start { s.start_end.0 = v; }
        if let Some(v) = self.end { s.start_end.1 = Some(v); }
        if let Some(v) = self.bins { s.bins = v; }
        if let Some(v) = self.bin_width { s.bin_width = v; }
        if let Some(v) = self.line_thickness { s.line_thickness = v; }
        if let Some(v) = self.min_freq { s.min_max_frequency.0 = v; }
        if let Some(v) = self.max_freq { s.min_max_frequency.1 = v; }
        if let Some(v) = self.inner_radius { s.inner_outer_radius.0 = v; }
        if let Some(v) = self.outer_radius { s.inner_outer_radius.1 = v; }
        if let Some(v) = self.color { s.color = v; }
        if let Some(v) = self.background { s.background_color = v; }
        if let Some(v) = self.smoothing { s.smoothing = v; }
        if let Some(v) = self.anti_aliasing { s.anti_aliasing = v; }
        if let Some(v) = self.polar_warp { s.polar_warp = v; }
        if let Some(ref v) = self.file_name { s.file_name = Some(v.clone()); }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "audiovis", "render", "song.mp3", "--style", "bar", "--variant", "lcd",
            "--fps", "24", "--polar-warp", "--smoothing", "false", "--color", "#00ff00",
            "--jobs", "2",
        ])
        .unwrap();
        let Command::Render { input, common, jobs, output, .. } = cli.command else {
            panic!("expected render");
        };
        assert_eq!(input, PathBuf::from("song.mp3"));
        assert_eq!(jobs, Some(2));
        assert!(output.is_none());

        let mut s = VisualizationSettings::default();
        common.style.apply(&mut s);
        assert_eq!(s.style, Style::Bar);
        assert_eq!(s.style_variant, "lcd");
        assert_eq!(s.framerate, 24);
        assert!(s.polar_warp);
        assert!(!s.smoothing);
        assert_eq!(s.color.0, [0, 255, 0]);
        // Untouched fields keep their value.
        assert_eq!(s.width, 854);
        assert!(s.anti_aliasing);
    }

    #[test]
    fn preview_input_is_optional() {
        let cli = Cli::try_parse_from(["audiovis", "preview", "-o", "p.png"]).unwrap();
        let Command::Preview { input, output, .. } = cli.command else {
            panic!("expected preview");
        };
        assert!(input.is_none());
        assert_eq!(output, PathBuf::from("p.png"));
    }

    #[test]
    fn bad_color_is_rejected_at_parse_time() {
        assert!(Cli::try_parse_from(["audiovis", "preview", "--color", "#zz0000"]).is_err());
    }
}
