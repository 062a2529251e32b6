//! Error taxonomy for scan submission, polling, and findings retrieval.

use std::time::Duration;

use thiserror::Error;

use crate::domain::models::TaskStatus;

/// Errors fatal to one scan. Any of these halts the convergence loop.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scanner binary could not be spawned.
    #[error("failed to launch scanner process: {0}")]
    Spawn(#[from] std::io::Error),

    /// The scanner process exited non-zero; the captured output is attached.
    #[error("scanner process failed:\n{0}")]
    ScannerFailed(String),

    /// The scanner output carried no `task?id=` marker.
    #[error("could not find task id in scanner output")]
    MissingTaskId,

    /// The analysis task ended in a terminal failure state.
    #[error("analysis {0}")]
    AnalysisEnded(TaskStatus),

    /// The analysis task did not reach a terminal state in time.
    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),

    /// A request to the quality server failed.
    #[error("quality server request failed: {0}")]
    Http(#[from] reqwest::Error),
}
