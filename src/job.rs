use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::audio::features::FeatureSeries;
use crate::error::{VisError, VisResult};
use crate::render::pipeline::FrameStore;
use crate::settings::VisualizationSettings;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Directory that holds one job's frames.
///
/// Temporary directories are removed with everything in them when dropped,
/// whether the job succeeded or not.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    cleanup: bool,
}

impl WorkDir {
    /// Fresh directory under the system temp dir, unique per process and call.
    pub fn temporary() -> VisResult<Self> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "audiovis_frames_{}_{}_{}",
            std::process::id(),
            nanos,
            SEQUENCE.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&path)?;
        log::debug!("Working directory: {}", path.display());
        Ok(Self {
            path,
            cleanup: true,
        })
    }

    /// Caller-chosen directory that survives the job. It must be empty or
    /// not exist yet, so stale frames can never leak into a video.
    pub fn persistent(path: impl Into<PathBuf>) -> VisResult<Self> {
        let path = path.into();
        if path.exists() {
            let mut entries = std::fs::read_dir(&path)?;
            if entries.next().is_some() {
                return Err(VisError::configuration(format!(
                    "frame directory {} is not empty",
                    path.display()
                )));
            }
        }
        std::fs::create_dir_all(&path)?;
        Ok(Self {
            path,
            cleanup: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.cleanup
    }

    /// Deletes everything inside the directory but keeps the directory.
    pub fn discard_contents(&self) -> std::io::Result<()> {
        for entry in std::fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(entry.path())?;
            } else {
                std::fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if !self.cleanup {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Everything one video generation produced. Dropping it discards the
/// frames unless they were written to a persistent directory.
#[derive(Debug)]
pub struct RenderJob {
    pub(crate) settings: VisualizationSettings,
    pub(crate) series: FeatureSeries,
    pub(crate) store: FrameStore,
    pub(crate) workdir: WorkDir,
}

impl RenderJob {
    pub fn settings(&self) -> &VisualizationSettings {
        &self.settings
    }

    pub fn series(&self) -> &FeatureSeries {
        &self.series
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn workdir(&self) -> &WorkDir {
        &self.workdir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_dir_is_removed_on_drop() {
        let dir = WorkDir::temporary().unwrap();
        let path = dir.path().to_path_buf();
        std::fs::write(path.join("00000.png"), b"x").unwrap();
        assert!(path.is_dir());
        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn temporary_dirs_are_distinct() {
        let a = WorkDir::temporary().unwrap();
        let b = WorkDir::temporary().unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn persistent_dir_survives_and_must_start_empty() {
        let path = std::env::temp_dir().join(format!(
            "audiovis_keep_{}_{}",
            std::process::id(),
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos()
        ));
        let dir = WorkDir::persistent(&path).unwrap();
        assert!(!dir.is_temporary());
        std::fs::write(path.join("00000.png"), b"x").unwrap();
        drop(dir);
        assert!(path.join("00000.png").exists());

        let err = WorkDir::persistent(&path).unwrap_err();
        assert!(matches!(err, VisError::Configuration(_)));
        std::fs::remove_dir_all(&path).unwrap();
    }

    #[test]
    fn discard_contents_empties_but_keeps_the_dir() {
        let dir = WorkDir::temporary().unwrap();
        std::fs::write(dir.path().join("00000.png"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("a"), b"x").unwrap();
        dir.discard_contents().unwrap();
        assert!(dir.path().is_dir());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
