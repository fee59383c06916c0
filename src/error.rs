use std::fmt;

pub type VisResult<T> = Result<T, VisError>;

/// One frame that failed to rasterize or persist.
#[derive(Debug, Clone)]
pub struct FrameFailure {
    pub index: usize,
    pub message: String,
}

impl fmt::Display for FrameFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {:05}: {}", self.index, self.message)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum VisError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("analysis error: {0}")]
    Analysis(String),

    #[error("render error at frame {index}: {message}")]
    Render { index: usize, message: String },

    #[error("pipeline error: {} of {total} frames failed (first: {})", failures.len(), first_failure(failures))]
    Pipeline {
        failures: Vec<FrameFailure>,
        total: usize,
    },

    #[error("assembly error: {0}")]
    Assembly(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn first_failure(failures: &[FrameFailure]) -> String {
    failures
        .first()
        .map(|f| f.to_string())
        .unwrap_or_else(|| "none".into())
}

impl VisError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }

    pub fn render(index: usize, msg: impl Into<String>) -> Self {
        Self::Render {
            index,
            message: msg.into(),
        }
    }

    pub fn assembly(msg: impl Into<String>) -> Self {
        Self::Assembly(msg.into())
    }

    /// Escalates per-frame failures. Returns `None` when nothing failed.
    pub fn pipeline(mut failures: Vec<FrameFailure>, total: usize) -> Option<Self> {
        if failures.is_empty() {
            return None;
        }
        failures.sort_by_key(|f| f.index);
        Some(Self::Pipeline { failures, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(VisError::configuration("x")
            .to_string()
            .contains("configuration error:"));
        assert!(VisError::analysis("x").to_string().contains("analysis error:"));
        assert!(VisError::assembly("x").to_string().contains("assembly error:"));
        assert!(VisError::render(7, "x")
            .to_string()
            .contains("render error at frame 7"));
    }

    #[test]
    fn pipeline_sorts_failures_and_reports_first() {
        let err = VisError::pipeline(
            vec![
                FrameFailure {
                    index: 9,
                    message: "late".into(),
                },
                FrameFailure {
                    index: 3,
                    message: "early".into(),
                },
            ],
            10,
        )
        .unwrap();
        let text = err.to_string();
        assert!(text.contains("2 of 10 frames failed"));
        assert!(text.contains("frame 00003: early"));
        match err {
            VisError::Pipeline { failures, .. } => {
                assert_eq!(failures[0].index, 3);
                assert_eq!(failures[1].index, 9);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_failure_set_does_not_escalate() {
        assert!(VisError::pipeline(Vec::new(), 5).is_none());
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = VisError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
