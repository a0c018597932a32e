//! Media fetch primitives.
//!
//! [`HttpMedia`] downloads a media URL with libcurl. [`UnavailableMedia`]
//! stands in for media whose source could not be resolved, so the job still
//! runs and ends as a recorded failure.

mod http;

pub use http::{create_unique_file, HttpMedia};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ChatexConfig;
use crate::error::TransferError;
use crate::media::{MediaFetch, ProgressCallback};

/// Per-transfer libcurl settings derived from config.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub proxy: Option<String>,
    pub proxy_user: Option<String>,
    pub proxy_password: Option<String>,
    pub connect_timeout: Duration,
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self::from_config(&ChatexConfig::default())
    }
}

impl CurlOptions {
    pub fn from_config(cfg: &ChatexConfig) -> Self {
        let transfer = cfg.transfer();
        let (proxy_user, proxy_password) = match cfg.proxy.as_ref().filter(|p| p.enable) {
            Some(p) => (p.user.clone(), p.password.clone()),
            None => (None, None),
        };
        Self {
            proxy: cfg.proxy_url(),
            proxy_user: proxy_user.filter(|u| !u.is_empty()),
            proxy_password: proxy_password.filter(|p| !p.is_empty()),
            connect_timeout: Duration::from_secs(transfer.connect_timeout_secs),
            low_speed_limit: transfer.low_speed_limit_bytes,
            low_speed_time: Duration::from_secs(transfer.low_speed_time_secs),
        }
    }
}

/// Media with no usable source. Every fetch fails with the stored reason.
#[derive(Debug, Clone)]
pub struct UnavailableMedia {
    reason: String,
}

impl UnavailableMedia {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl MediaFetch for UnavailableMedia {
    async fn fetch(
        &self,
        _dest_dir: &Path,
        _file_name: &str,
        _progress: ProgressCallback,
    ) -> Result<PathBuf, TransferError> {
        Err(TransferError::Remote(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProxyConfig, ProxyKind, TransferConfig};

    #[test]
    fn options_follow_config() {
        let cfg = ChatexConfig {
            proxy: Some(ProxyConfig {
                enable: true,
                kind: ProxyKind::Socks5,
                address: "127.0.0.1:1080".into(),
                user: Some("alice".into()),
                password: Some(String::new()),
            }),
            transfer: Some(TransferConfig {
                connect_timeout_secs: 3,
                low_speed_limit_bytes: 1,
                low_speed_time_secs: 9,
            }),
            ..Default::default()
        };
        let opts = CurlOptions::from_config(&cfg);
        assert_eq!(opts.proxy.as_deref(), Some("socks5h://127.0.0.1:1080"));
        assert_eq!(opts.proxy_user.as_deref(), Some("alice"));
        assert!(opts.proxy_password.is_none());
        assert_eq!(opts.connect_timeout, Duration::from_secs(3));
        assert_eq!(opts.low_speed_time, Duration::from_secs(9));
    }

    #[test]
    fn disabled_proxy_drops_credentials() {
        let cfg = ChatexConfig {
            proxy: Some(ProxyConfig {
                enable: false,
                kind: ProxyKind::Http,
                address: "proxy:3128".into(),
                user: Some("bob".into()),
                password: Some("pw".into()),
            }),
            ..Default::default()
        };
        let opts = CurlOptions::from_config(&cfg);
        assert!(opts.proxy.is_none());
        assert!(opts.proxy_user.is_none());
    }

    #[tokio::test]
    async fn unavailable_media_always_fails() {
        let media = UnavailableMedia::new("no url");
        let err = media
            .fetch(Path::new("/tmp"), "x", std::sync::Arc::new(|_, _| {}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "remote: no url");
    }
}
