//! Fetch executor: runs one job's transfer under the concurrency gate.

use std::path::Path;
use std::sync::Arc;

use crate::error::GateError;
use crate::media::{DownloadJob, ProgressCallback};

use super::gate::ConcurrencyGate;
use super::progress::{ProgressSink, ProgressTracker};
use super::result::{JobOutcome, JobState};

fn log_transition(job: &DownloadJob, state: JobState) {
    tracing::debug!(job_id = job.id(), file = job.file_name(), %state, "job state");
}

/// Runs one job end-to-end: acquire the gate, transfer while forwarding
/// progress, release the gate.
///
/// Transfer failures (network, filesystem, remote, cancellation) are returned
/// as `Ok(JobOutcome::Failure)`. `Err` is reserved for a broken gate protocol,
/// which is fatal for the whole batch.
pub async fn execute_job(
    job: &DownloadJob,
    dest_dir: &Path,
    gate: &ConcurrencyGate,
    sink: Arc<dyn ProgressSink>,
) -> Result<JobOutcome, GateError> {
    log_transition(job, JobState::Pending);
    let permit = gate.acquire().await?;
    log_transition(job, JobState::Admitted);

    let outcome = transfer(job, dest_dir, sink).await;

    drop(permit);
    log_transition(job, outcome.state());
    match &outcome {
        JobOutcome::Success { path, .. } => {
            tracing::info!(job_id = job.id(), path = %path.display(), "media downloaded");
        }
        JobOutcome::Failure { reason, .. } => {
            tracing::warn!(job_id = job.id(), error = %reason, "media download failed");
        }
    }
    Ok(outcome)
}

/// Transfer phase of an admitted job. Never fails outward.
async fn transfer(job: &DownloadJob, dest_dir: &Path, sink: Arc<dyn ProgressSink>) -> JobOutcome {
    if let Err(e) = tokio::fs::create_dir_all(dest_dir).await {
        return JobOutcome::Failure {
            job_id: job.id(),
            reason: format!("create download dir {}: {}", dest_dir.display(), e),
        };
    }

    let tracker = Arc::new(ProgressTracker::new(
        job.id(),
        job.label(),
        job.expected_size(),
        sink,
    ));
    let progress: ProgressCallback = {
        let tracker = Arc::clone(&tracker);
        Arc::new(move |done, total| tracker.on_progress(done, total))
    };

    log_transition(job, JobState::InFlight);
    let result = job
        .handle()
        .fetch(dest_dir, job.file_name(), progress)
        .await;
    tracker.flush();

    match result {
        Ok(path) => JobOutcome::Success {
            job_id: job.id(),
            path,
        },
        Err(e) => JobOutcome::Failure {
            job_id: job.id(),
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransferError;
    use crate::media::MediaFetch;
    use crate::scheduler::progress::tests::RecordingSink;
    use async_trait::async_trait;
    use std::num::NonZeroUsize;
    use std::path::PathBuf;

    /// Emits a fixed progress sequence, then succeeds or fails.
    struct ScriptedFetch {
        events: Vec<(u64, u64)>,
        fail: Option<String>,
    }

    #[async_trait]
    impl MediaFetch for ScriptedFetch {
        async fn fetch(
            &self,
            dest_dir: &Path,
            file_name: &str,
            progress: ProgressCallback,
        ) -> Result<PathBuf, TransferError> {
            for (done, total) in &self.events {
                progress(*done, *total);
            }
            match &self.fail {
                Some(reason) => Err(TransferError::Remote(reason.clone())),
                None => Ok(dest_dir.join(file_name)),
            }
        }
    }

    fn gate(k: usize) -> ConcurrencyGate {
        ConcurrencyGate::new(NonZeroUsize::new(k).unwrap())
    }

    #[tokio::test]
    async fn success_forwards_clamped_progress() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let job = DownloadJob::new(
            4,
            "a.bin",
            100,
            Arc::new(ScriptedFetch {
                events: vec![(30, 100), (20, 100), (100, 100)],
                fail: None,
            }),
        );
        let gate = gate(1);
        let outcome = execute_job(&job, dir.path(), &gate, sink.clone())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            JobOutcome::Success {
                job_id: 4,
                path: dir.path().join("a.bin"),
            }
        );
        let done: Vec<u64> = sink
            .renders
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.bytes_done)
            .collect();
        assert_eq!(done, vec![30, 30, 100, 100]);
        assert_eq!(gate.in_use(), 0);
    }

    #[tokio::test]
    async fn failure_is_recorded_and_gate_released() {
        let dir = tempfile::tempdir().unwrap();
        let job = DownloadJob::new(
            5,
            "b.bin",
            0,
            Arc::new(ScriptedFetch {
                events: vec![],
                fail: Some("connection reset".into()),
            }),
        );
        let gate = gate(1);
        let outcome = execute_job(&job, dir.path(), &gate, Arc::new(RecordingSink::default()))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            JobOutcome::Failure {
                job_id: 5,
                reason: "remote: connection reset".into(),
            }
        );
        assert_eq!(gate.in_use(), 0);
    }

    #[tokio::test]
    async fn creates_missing_destination_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("media").join("chat");
        let job = DownloadJob::new(
            6,
            "c.bin",
            0,
            Arc::new(ScriptedFetch {
                events: vec![],
                fail: None,
            }),
        );
        let outcome = execute_job(&job, &nested, &gate(1), Arc::new(RecordingSink::default()))
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn closed_gate_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let job = DownloadJob::new(
            7,
            "d.bin",
            0,
            Arc::new(ScriptedFetch {
                events: vec![],
                fail: None,
            }),
        );
        let gate = gate(1);
        gate.close();
        let err = execute_job(&job, dir.path(), &gate, Arc::new(RecordingSink::default()))
            .await
            .unwrap_err();
        assert_eq!(err, GateError::Closed);
    }
}
