//! Logging init: append to a file under the XDG state dir, or stderr as fallback.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info,chatex=debug,chatex_core=debug";

/// Location of the log file: `~/.local/state/chatex/chatex.log`.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("chatex")?;
    Ok(xdg_dirs.get_state_home().join("chatex").join("chatex.log"))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Per-event writer; a log handle that cannot be cloned degrades to stderr.
enum LogWriter {
    File(fs::File),
    Stderr,
}

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogWriter::File(f) => f.write(buf),
            LogWriter::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogWriter::File(f) => f.flush(),
            LogWriter::Stderr => io::stderr().lock().flush(),
        }
    }
}

struct SharedLogFile(fs::File);

impl<'a> MakeWriter<'a> for SharedLogFile {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(LogWriter::File)
            .unwrap_or(LogWriter::Stderr)
    }
}

/// Initialize structured logging to the XDG state log file.
/// Returns Err when the directory or file cannot be opened, or a subscriber is
/// already installed, so the caller can fall back to [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    let log_file_path = log_file_path()?;
    if let Some(dir) = log_file_path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("create log dir: {}", dir.display()))?;
    }

    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
        .with_context(|| format!("open log file: {}", log_file_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(BoxMakeWriter::new(SharedLogFile(file)))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install log subscriber: {}", e))?;

    tracing::info!("chatex logging initialized at {}", log_file_path.display());
    Ok(())
}

/// Initialize logging to stderr only. Ignores an already-installed subscriber.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}
