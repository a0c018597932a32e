//! Error types shared by the fetch primitive, the concurrency gate and the archive source.

use std::path::PathBuf;

/// Failure of a single media transfer. Recorded by the fetch executor as a
/// per-job `Failure`; never escapes the executor.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// libcurl reported an error (connect, timeout, proxy, ...).
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    /// Server answered with a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Local filesystem error (create, write, permission).
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// Transfer was stopped before completion.
    #[error("transfer cancelled")]
    Cancelled,
    /// Remote side reported a failure that is not an HTTP status.
    #[error("remote: {0}")]
    Remote(String),
}

/// Broken admission protocol on the concurrency gate. Fatal for the batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("gate protocol violation: {in_use} holders admitted with capacity {capacity}")]
    ProtocolViolation { in_use: usize, capacity: usize },
    #[error("gate protocol violation: release without matching acquire")]
    ReleaseWithoutAcquire,
    #[error("gate closed")]
    Closed,
}

/// Chat archive could not be loaded or queried.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("read archive {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse archive: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("chat not found: {0}")]
    ChatNotFound(String),
    #[error("chat {chat_id}: duplicate message id {message_id}")]
    DuplicateMessageId { chat_id: i64, message_id: i64 },
}
