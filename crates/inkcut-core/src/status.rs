//! Job lifecycle status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a job
///
/// `Staged -> Waiting -> Approved -> Running -> Complete` on the happy path.
/// `Cancelled` and `Error` are terminal for the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created or queued, not yet started
    #[default]
    Staged,
    /// Waiting for approval
    Waiting,
    /// Approved, about to stream
    Approved,
    /// Streaming commands to the device
    Running,
    /// Cancelled by the user or rejected at approval
    Cancelled,
    /// Connection or write failure
    Error,
    /// Finished successfully
    Complete,
}

impl JobStatus {
    /// Whether this status ends a run
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Error | Self::Complete)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Staged => "staged",
            Self::Waiting => "waiting",
            Self::Approved => "approved",
            Self::Running => "running",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
            Self::Complete => "complete",
        };
        f.write_str(s)
    }
}
