//! HTML report of exported messages.

mod html;

pub use html::{escape_html, render_report};

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::MessageRecord;

/// Report path with the extension forced to `.html`.
pub fn report_path(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == "html" => path.to_path_buf(),
        _ => path.with_extension("html"),
    }
}

/// Writes the report for `records` and returns the path written.
/// Returns `Ok(None)` without touching the filesystem when there are no records.
pub fn write_report(path: &Path, chat_name: &str, records: &[MessageRecord]) -> Result<Option<PathBuf>> {
    if records.is_empty() {
        return Ok(None);
    }

    let path = report_path(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create report dir: {}", parent.display()))?;
    }
    fs::write(&path, render_report(chat_name, records))
        .with_context(|| format!("write report: {}", path.display()))?;
    tracing::info!(path = %path.display(), messages = records.len(), "report written");
    Ok(Some(path))
}
