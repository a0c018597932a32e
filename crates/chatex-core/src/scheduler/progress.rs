//! Per-job progress tracking (bytes done, total, rate, ETA).
//!
//! Each fetch owns one [`ProgressTracker`]. Raw `(bytes_done, bytes_total)`
//! callbacks go through [`ProgressState::advance`], which clamps regressions,
//! and the resulting [`ProgressStats`] are handed to a [`ProgressSink`].
//! Render failures are logged and swallowed; they never reach the transfer.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::Result;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::media::JobId;

/// Progress of one job. Updated only through [`ProgressState::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    pub job_id: JobId,
    /// Never decreases.
    pub bytes_done: u64,
    /// 0 while unknown; only ever revised upward.
    pub bytes_total: u64,
    pub label: String,
}

impl ProgressState {
    pub fn new(job_id: JobId, label: impl Into<String>, expected_total: u64) -> Self {
        Self {
            job_id,
            bytes_done: 0,
            bytes_total: expected_total,
            label: label.into(),
        }
    }

    /// Applies one progress report. A lower `bytes_done` than already seen is
    /// clamped to the previous value; a lower `bytes_total` is ignored.
    pub fn advance(self, bytes_done: u64, bytes_total: u64) -> Self {
        Self {
            bytes_done: self.bytes_done.max(bytes_done),
            bytes_total: self.bytes_total.max(bytes_total),
            ..self
        }
    }
}

/// Snapshot of download progress for one job (CLI-friendly).
#[derive(Debug, Clone)]
pub struct ProgressStats {
    pub job_id: JobId,
    pub label: String,
    pub bytes_done: u64,
    /// 0 when the size is unknown.
    pub total_bytes: u64,
    /// Elapsed time since the transfer started (seconds).
    pub elapsed_secs: f64,
    /// Set on the last render of a job.
    pub finished: bool,
}

impl ProgressStats {
    fn from_state(state: &ProgressState, elapsed_secs: f64, finished: bool) -> Self {
        Self {
            job_id: state.job_id,
            label: state.label.clone(),
            bytes_done: state.bytes_done,
            total_bytes: state.bytes_total,
            elapsed_secs,
            finished,
        }
    }

    /// Download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if the size is unknown or the rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0]; `None` while the size is unknown.
    pub fn fraction(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        Some((self.bytes_done as f64 / self.total_bytes as f64).min(1.0))
    }
}

/// Destination of progress renders (console, log, UI).
pub trait ProgressSink: Send + Sync {
    fn render(&self, stats: &ProgressStats) -> Result<()>;
}

/// Renders progress as debug log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn render(&self, stats: &ProgressStats) -> Result<()> {
        tracing::debug!(
            job_id = stats.job_id,
            bytes_done = stats.bytes_done,
            total_bytes = stats.total_bytes,
            finished = stats.finished,
            "{}",
            stats.label
        );
        Ok(())
    }
}

/// Forwards progress to a bounded channel. An intermediate update that meets a
/// full channel is dropped and reported as a render error. A job's final render
/// is never dropped while the receiver is alive: when the channel is full it is
/// delivered from a spawned task instead.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<ProgressStats>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<ProgressStats>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn render(&self, stats: &ProgressStats) -> Result<()> {
        match self.tx.try_send(stats.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(stats)) if stats.finished => {
                let handle = tokio::runtime::Handle::try_current()
                    .map_err(|e| anyhow::anyhow!("progress channel full: {}", e))?;
                let tx = self.tx.clone();
                handle.spawn(async move {
                    // Receiver gone: nobody is left to print it.
                    let _ = tx.send(stats).await;
                });
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!("progress channel: {}", e)),
        }
    }
}

/// Progress observer for a single job's transfer.
pub struct ProgressTracker {
    state: Mutex<ProgressState>,
    started: Instant,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressTracker {
    pub fn new(
        job_id: JobId,
        label: impl Into<String>,
        expected_total: u64,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            state: Mutex::new(ProgressState::new(job_id, label, expected_total)),
            started: Instant::now(),
            sink,
        }
    }

    /// Records a progress report and renders the clamped state.
    pub fn on_progress(&self, bytes_done: u64, bytes_total: u64) {
        let stats = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            *state = state.clone().advance(bytes_done, bytes_total);
            ProgressStats::from_state(&state, self.started.elapsed().as_secs_f64(), false)
        };
        self.render(&stats);
    }

    /// Renders the current state again, marked as the job's final render.
    pub fn flush(&self) {
        let stats = ProgressStats::from_state(
            &self.state(),
            self.started.elapsed().as_secs_f64(),
            true,
        );
        self.render(&stats);
    }

    /// Current state.
    pub fn state(&self) -> ProgressState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn render(&self, stats: &ProgressStats) {
        if let Err(e) = self.sink.render(stats) {
            tracing::warn!(job_id = stats.job_id, error = %e, "progress render failed");
        }
    }
}
