//! Media download scheduler.
//!
//! Pipeline for one export run: jobs → smallest-first ordering → one fetch
//! executor per job, admitted through a shared [`ConcurrencyGate`] → per-job
//! outcome → [`BatchResult`].

mod batch;
mod execute;
mod gate;
mod progress;
mod result;

pub use batch::{order_jobs, run_batch, BatchOptions};
pub use execute::execute_job;
pub use gate::{ConcurrencyGate, GatePermit};
pub use progress::{
    ChannelSink, ProgressSink, ProgressState, ProgressStats, ProgressTracker, TracingSink,
};
pub use result::{BatchResult, BatchSummary, JobOutcome, JobState};
