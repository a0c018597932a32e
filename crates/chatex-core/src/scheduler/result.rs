//! Per-job terminal outcomes and the batch result built from them.

use std::fmt;
use std::path::PathBuf;

use crate::media::JobId;

/// Lifecycle of one job inside the fetch executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Admitted,
    InFlight,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Admitted => "admitted",
            JobState::InFlight => "in-flight",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Terminal outcome of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success { job_id: JobId, path: PathBuf },
    Failure { job_id: JobId, reason: String },
}

impl JobOutcome {
    pub fn job_id(&self) -> JobId {
        match self {
            JobOutcome::Success { job_id, .. } | JobOutcome::Failure { job_id, .. } => *job_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success { .. })
    }

    pub fn state(&self) -> JobState {
        if self.is_success() {
            JobState::Completed
        } else {
            JobState::Failed
        }
    }
}

/// Outcomes of one batch, in completion order. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    outcomes: Vec<JobOutcome>,
}

impl BatchResult {
    pub(crate) fn new(outcomes: Vec<JobOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[JobOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcome_for(&self, job_id: JobId) -> Option<&JobOutcome> {
        self.outcomes.iter().find(|o| o.job_id() == job_id)
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for outcome in &self.outcomes {
            match outcome {
                JobOutcome::Success { .. } => summary.succeeded += 1,
                JobOutcome::Failure { job_id, reason } => {
                    summary.failed += 1;
                    summary.failures.push((*job_id, reason.clone()));
                }
            }
        }
        summary
    }
}

/// Counts for the end-of-run report. A batch with failures is still a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// `(job_id, reason)` for each failure, in completion order.
    pub failures: Vec<(JobId, String)>,
}
