//! Single-stream HTTP GET into the download directory.
//!
//! The blocking libcurl transfer runs on tokio's blocking pool. The body is
//! written sequentially; curl's progress callback feeds the job's tracker.

use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::CurlOptions;
use crate::error::TransferError;
use crate::media::{MediaFetch, ProgressCallback};

/// Media served at a URL (http, https or file).
#[derive(Debug, Clone)]
pub struct HttpMedia {
    url: String,
    options: CurlOptions,
}

impl HttpMedia {
    pub fn new(url: impl Into<String>, options: CurlOptions) -> Self {
        Self {
            url: url.into(),
            options,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl MediaFetch for HttpMedia {
    async fn fetch(
        &self,
        dest_dir: &Path,
        file_name: &str,
        progress: ProgressCallback,
    ) -> Result<PathBuf, TransferError> {
        let url = self.url.clone();
        let options = self.options.clone();
        let dest_dir = dest_dir.to_path_buf();
        let file_name = file_name.to_string();
        tokio::task::spawn_blocking(move || -> Result<PathBuf, TransferError> {
            let (path, file) = create_unique_file(&dest_dir, &file_name)?;
            if let Err(e) = download_to(&url, file, &options, &progress) {
                let _ = std::fs::remove_file(&path);
                return Err(e);
            }
            tracing::debug!(path = %path.display(), "media saved");
            Ok(path)
        })
        .await
        .map_err(|e| TransferError::Remote(format!("transfer task: {}", e)))?
    }
}

/// Creates the first free file for `file_name` in `dir`: `name.ext`, then
/// `name (1).ext`, `name (2).ext`, ... Uses `create_new`, so concurrent jobs
/// with the same name never share a file.
pub fn create_unique_file(dir: &Path, file_name: &str) -> io::Result<(PathBuf, File)> {
    let as_path = Path::new(file_name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let candidates = std::iter::once(dir.join(file_name))
        .chain((1u32..).map(|n| dir.join(format!("{} ({}){}", stem, n, ext))));
    for path in candidates {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(io::ErrorKind::AlreadyExists, "no free file name"))
}

/// Downloads `url` into `file`, reporting `(done, total)` as it goes.
fn download_to(
    url: &str,
    mut file: File,
    options: &CurlOptions,
    progress: &ProgressCallback,
) -> Result<u64, TransferError> {
    let mut written: u64 = 0;
    let mut write_error: Option<io::Error> = None;

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(options.connect_timeout)?;
    easy.low_speed_limit(options.low_speed_limit)?;
    easy.low_speed_time(options.low_speed_time)?;
    if let Some(proxy) = options.proxy.as_deref() {
        easy.proxy(proxy)?;
    }
    if let Some(user) = options.proxy_user.as_deref() {
        easy.proxy_username(user)?;
    }
    if let Some(password) = options.proxy_password.as_deref() {
        easy.proxy_password(password)?;
    }
    easy.progress(true)?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| match file.write_all(data) {
            Ok(()) => {
                written += data.len() as u64;
                Ok(data.len())
            }
            Err(e) => {
                write_error = Some(e);
                Ok(0) // abort transfer
            }
        })?;
        transfer.progress_function(|dl_total, dl_now, _, _| {
            progress(dl_now.max(0.0) as u64, dl_total.max(0.0) as u64);
            true
        })?;
        transfer.perform()
    };

    if let Some(e) = write_error {
        return Err(TransferError::Io(e));
    }
    performed?;

    // file:// and other non-HTTP schemes report 0.
    let code = easy.response_code()?;
    if code != 0 && !(200..300).contains(&code) {
        return Err(TransferError::Http(code));
    }

    file.flush()?;
    progress(written, written);
    tracing::debug!(url, bytes = written, "transfer complete");
    Ok(written)
}
