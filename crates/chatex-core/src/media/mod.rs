//! Media download jobs.
//!
//! Turns a message that carries media into an immutable [`DownloadJob`]:
//! resolved filename, expected size and the fetch handle used to transfer it.
//! Extraction performs no I/O and never fails; missing attributes degrade to
//! synthesized values.

mod sanitize;

pub use sanitize::sanitize_filename;

use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::TransferError;

/// Message id; unique within one batch.
pub type JobId = i64;

/// Progress callback handed to a fetch primitive: `(bytes_done, bytes_total)`.
/// `bytes_total` is 0 while the size is unknown.
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Filename used when a message has neither a filename nor an extension.
const FALLBACK_FILENAME: &str = "media";

/// Transfer primitive attached to a media message (owned by the source layer).
#[async_trait]
pub trait MediaFetch: Send + Sync {
    /// Transfers the media into `dest_dir`, naming it after `file_name`, and
    /// returns the final path. Picking a free name when `file_name` already
    /// exists is up to the implementation.
    async fn fetch(
        &self,
        dest_dir: &Path,
        file_name: &str,
        progress: ProgressCallback,
    ) -> Result<PathBuf, TransferError>;
}

/// Media attributes as declared by the remote side. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaAttributes {
    pub file_name: Option<String>,
    /// Extension, with or without the leading dot.
    pub ext: Option<String>,
    /// Declared size; negative values are treated as unreadable.
    pub size: Option<i64>,
}

/// A message already known to carry media.
#[derive(Clone)]
pub struct MediaMessage {
    pub id: JobId,
    pub attributes: MediaAttributes,
    pub handle: Arc<dyn MediaFetch>,
}

impl fmt::Debug for MediaMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaMessage")
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

/// One unit of download work. Immutable once extracted.
#[derive(Clone)]
pub struct DownloadJob {
    id: JobId,
    file_name: String,
    expected_size: u64,
    handle: Arc<dyn MediaFetch>,
}

impl DownloadJob {
    pub fn new(
        id: JobId,
        file_name: impl Into<String>,
        expected_size: u64,
        handle: Arc<dyn MediaFetch>,
    ) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            expected_size,
            handle,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Expected size in bytes; 0 means unknown.
    pub fn expected_size(&self) -> u64 {
        self.expected_size
    }

    pub fn handle(&self) -> &Arc<dyn MediaFetch> {
        &self.handle
    }

    /// Label shown next to this job's progress.
    pub fn label(&self) -> String {
        format!("Msg {} ({})", self.id, self.file_name)
    }
}

impl fmt::Debug for DownloadJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadJob")
            .field("id", &self.id)
            .field("file_name", &self.file_name)
            .field("expected_size", &self.expected_size)
            .finish_non_exhaustive()
    }
}

/// Resolves the filename: explicit name, else `{id}{ext}`, else `"media"`.
pub fn resolve_filename(id: JobId, attrs: &MediaAttributes) -> String {
    if let Some(name) = attrs.file_name.as_deref() {
        let name = sanitize_filename(name);
        if !name.is_empty() {
            return name;
        }
    }

    if let Some(ext) = attrs.ext.as_deref() {
        let ext = sanitize_filename(ext.trim_start_matches('.'));
        if !ext.is_empty() {
            return format!("{}.{}", id, ext);
        }
    }

    tracing::debug!(job_id = id, "no filename or extension; using fallback name");
    FALLBACK_FILENAME.to_string()
}

/// Declared size, or 0 when absent or unreadable.
pub fn resolve_size(id: JobId, attrs: &MediaAttributes) -> u64 {
    match attrs.size {
        Some(size) if size >= 0 => size as u64,
        Some(size) => {
            tracing::debug!(job_id = id, size, "unreadable declared size; treating as unknown");
            0
        }
        None => 0,
    }
}

/// Builds the download job for a media message. Never fails.
pub fn extract_job(message: &MediaMessage) -> DownloadJob {
    DownloadJob::new(
        message.id,
        resolve_filename(message.id, &message.attributes),
        resolve_size(message.id, &message.attributes),
        Arc::clone(&message.handle),
    )
}

/// Extracts jobs for all messages, preserving discovery order. Job ids are
/// unique in the result: a repeated message id keeps its first occurrence.
pub fn extract_jobs(messages: &[MediaMessage]) -> Vec<DownloadJob> {
    let mut seen = HashSet::with_capacity(messages.len());
    messages
        .iter()
        .filter(|m| {
            let first = seen.insert(m.id);
            if !first {
                tracing::warn!(job_id = m.id, "duplicate media message id; skipping");
            }
            first
        })
        .map(extract_job)
        .collect()
}
