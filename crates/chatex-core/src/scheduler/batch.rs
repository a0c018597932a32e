//! Batch orchestrator: order jobs smallest-first, launch one executor per job
//! under a shared gate, and join them all.
//!
//! Every launched job ends in exactly one outcome. A failed job never stops
//! its siblings; only a broken gate protocol aborts the batch.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::{self, JoinSet};

use crate::error::GateError;
use crate::media::{DownloadJob, JobId};

use super::execute::execute_job;
use super::gate::ConcurrencyGate;
use super::progress::ProgressSink;
use super::result::{BatchResult, JobOutcome};

/// Settings for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Gate capacity K. 0 skips the batch.
    pub max_concurrent: usize,
    pub download_dir: PathBuf,
}

/// Stable sort by expected size, ascending. Unknown size (0) sorts first and
/// equal sizes keep discovery order.
pub fn order_jobs(mut jobs: Vec<DownloadJob>) -> Vec<DownloadJob> {
    jobs.sort_by_key(DownloadJob::expected_size);
    jobs
}

/// Downloads all `jobs` with at most `opts.max_concurrent` transfers in flight.
///
/// Returns outcomes in completion order. Empty input or a capacity of 0
/// returns an empty result without launching anything.
pub async fn run_batch(
    jobs: Vec<DownloadJob>,
    opts: &BatchOptions,
    sink: Arc<dyn ProgressSink>,
) -> Result<BatchResult, GateError> {
    let Some(capacity) = NonZeroUsize::new(opts.max_concurrent) else {
        tracing::info!(jobs = jobs.len(), "downloads disabled (max_concurrent = 0)");
        return Ok(BatchResult::default());
    };
    if jobs.is_empty() {
        return Ok(BatchResult::default());
    }

    let jobs = order_jobs(jobs);
    let total = jobs.len();
    tracing::info!(
        jobs = total,
        max_concurrent = capacity.get(),
        dir = %opts.download_dir.display(),
        "starting media batch"
    );

    let gate = ConcurrencyGate::new(capacity);
    let result = run_with_gate(jobs, &gate, &opts.download_dir, sink).await?;
    let summary = result.summary();
    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "media batch finished"
    );
    Ok(result)
}

/// Launches every job of an already ordered batch under `gate` and joins them.
pub(crate) async fn run_with_gate(
    jobs: Vec<DownloadJob>,
    gate: &ConcurrencyGate,
    download_dir: &Path,
    sink: Arc<dyn ProgressSink>,
) -> Result<BatchResult, GateError> {
    let total = jobs.len();
    let mut launched: HashMap<task::Id, JobId> = HashMap::with_capacity(total);
    let mut join_set = JoinSet::new();
    for job in jobs {
        let job_id = job.id();
        let gate = gate.clone();
        let dir = download_dir.to_path_buf();
        let sink = Arc::clone(&sink);
        let handle =
            join_set.spawn(async move { execute_job(&job, &dir, &gate, sink).await });
        launched.insert(handle.id(), job_id);
    }

    let mut outcomes = Vec::with_capacity(total);
    while let Some(joined) = join_set.join_next_with_id().await {
        match joined {
            Ok((task_id, Ok(outcome))) => {
                launched.remove(&task_id);
                outcomes.push(outcome);
            }
            Ok((task_id, Err(e))) => {
                let job_id = launched.get(&task_id).copied();
                tracing::error!(?job_id, error = %e, "aborting media batch");
                gate.close();
                join_set.abort_all();
                return Err(e);
            }
            Err(e) => {
                let Some(job_id) = launched.remove(&e.id()) else {
                    tracing::error!(error = %e, "join error for unknown executor task");
                    continue;
                };
                tracing::error!(job_id, error = %e, "executor task terminated abnormally");
                outcomes.push(JobOutcome::Failure {
                    job_id,
                    reason: format!("executor task terminated abnormally: {}", e),
                });
            }
        }
    }

    gate.check()?;
    let in_use = gate.in_use();
    if in_use != 0 {
        return Err(GateError::ProtocolViolation {
            in_use,
            capacity: gate.capacity(),
        });
    }
    Ok(BatchResult::new(outcomes))
}
