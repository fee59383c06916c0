use image::{ImageFormat, RgbImage};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::frame::FrameRenderer;
use crate::audio::features::FeatureSeries;
use crate::error::{FrameFailure, VisError, VisResult};

/// Upper bound on render workers regardless of core count.
pub const MAX_WORKERS: usize = 8;

/// Fewest digits in a frame file name.
pub const MIN_INDEX_WIDTH: usize = 5;

/// Digits needed so every index below `frame_count` has the same width,
/// which keeps lexical order equal to frame order.
pub fn index_width(frame_count: usize) -> usize {
    let last = frame_count.saturating_sub(1);
    let digits = last.checked_ilog10().map_or(1, |d| d as usize + 1);
    digits.max(MIN_INDEX_WIDTH)
}

pub fn frame_file_name(index: usize, width: usize) -> String {
    format!("{:0width$}.png", index, width = width)
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_WORKERS)
}

/// Ordered, index-addressed set of persisted frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStore {
    dir: PathBuf,
    frame_count: usize,
    index_width: usize,
    fps: u32,
    width: u32,
    height: u32,
}

impl FrameStore {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.frame_count
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(frame_file_name(index, self.index_width))
    }

    /// printf-style input pattern understood by ffmpeg.
    pub fn pattern(&self) -> PathBuf {
        self.dir.join(format!("%0{}d.png", self.index_width))
    }

    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        (0..self.frame_count).map(|i| self.frame_path(i))
    }
}

/// Renders every frame of a series on a bounded worker pool.
pub struct FramePipeline {
    workers: usize,
    progress: ProgressBar,
}

impl Default for FramePipeline {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FramePipeline {
    pub fn new(workers: Option<usize>) -> Self {
        let workers = workers.unwrap_or_else(default_workers).max(1);
        Self {
            workers,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn run(
        &self,
        renderer: &FrameRenderer,
        series: &FeatureSeries,
        fps: u32,
        out_dir: &Path,
    ) -> VisResult<FrameStore> {
        let (width, height) = renderer.dimensions();
        self.run_with(series, fps, (width, height), out_dir, |_, values| {
            renderer.render(values)
        })
    }

    /// Core fan-out: `render` is called once per frame index, from any worker.
    ///
    /// Frames that fail are collected by index; if any failed the whole run
    /// fails with [`VisError::Pipeline`] after every frame has been attempted.
    pub fn run_with<F>(
        &self,
        series: &FeatureSeries,
        fps: u32,
        (width, height): (u32, u32),
        out_dir: &Path,
        render: F,
    ) -> VisResult<FrameStore>
    where
        F: Fn(usize, &[f32]) -> VisResult<RgbImage> + Sync,
    {
        std::fs::create_dir_all(out_dir)?;
        let total = series.len();
        let digits = index_width(total);
        let started = Instant::now();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("frame-worker-{}", i))
            .build()
            .map_err(|e| VisError::Other(anyhow::anyhow!("failed to start worker pool: {}", e)))?;

        log::info!("Rendering {} frames on {} workers...", total, self.workers);
        self.progress.set_length(total as u64);

        let failures: Vec<FrameFailure> = pool.install(|| {
            (0..total)
                .into_par_iter()
                .filter_map(|index| {
                    let result = render(index, series.frame(index))
                        .map_err(|err| as_render_error(index, err))
                        .and_then(|img| persist(&img, out_dir, index, digits));
                    self.progress.inc(1);
                    match result {
                        Ok(()) => None,
                        Err(err) => {
                            log::warn!("Frame {} failed: {}", index, err);
                            Some(FrameFailure {
                                index,
                                message: err.to_string(),
                            })
                        }
                    }
                })
                .collect()
        });

        self.progress.finish_and_clear();
        if let Some(err) = VisError::pipeline(failures, total) {
            return Err(err);
        }

        log::info!("Saving frames: {:.2}s", started.elapsed().as_secs_f32());
        Ok(FrameStore {
            dir: out_dir.to_path_buf(),
            frame_count: total,
            index_width: digits,
            fps,
            width,
            height,
        })
    }
}

/// Anything that goes wrong while producing one frame is that frame's
/// render failure.
fn as_render_error(index: usize, err: VisError) -> VisError {
    match err {
        VisError::Render { .. } => err,
        other => VisError::render(index, other.to_string()),
    }
}

/// Writes to a temporary sibling and renames, so the final address only ever
/// holds a complete raster.
fn persist(img: &RgbImage, dir: &Path, index: usize, digits: usize) -> VisResult<()> {
    let name = frame_file_name(index, digits);
    let final_path = dir.join(&name);
    let tmp_path = dir.join(format!(".{}.tmp", name));

    let written = img
        .save_with_format(&tmp_path, ImageFormat::Png)
        .map_err(|e| VisError::render(index, format!("failed to encode {}: {}", name, e)))
        .and_then(|()| {
            std::fs::rename(&tmp_path, &final_path)
                .map_err(|e| VisError::render(index, format!("failed to store {}: {}", name, e)))
        });
    if written.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    written
}
