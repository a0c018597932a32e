use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Media download settings (`[download]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Maximum number of media transfers in flight at once. 0 disables downloading.
    pub max_concurrent_downloads: usize,
    /// Directory media files are written to (created if missing).
    pub download_path: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 3,
            download_path: PathBuf::from("output/media"),
        }
    }
}

/// HTML report settings (`[export]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Report path; an `.html` extension is forced when writing.
    pub output_file: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_file: PathBuf::from("output/messages.html"),
        }
    }
}

/// Proxy protocol for media transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    #[default]
    Socks5,
    Http,
}

/// Optional proxy section (`[proxy]` in config.toml).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub enable: bool,
    #[serde(default)]
    pub kind: ProxyKind,
    /// `host:port`.
    pub address: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Proxy URL for libcurl, or `None` when disabled or no address is set.
    /// SOCKS5 resolves hostnames on the proxy side.
    pub fn url(&self) -> Option<String> {
        if !self.enable || self.address.trim().is_empty() {
            return None;
        }
        let scheme = match self.kind {
            ProxyKind::Socks5 => "socks5h",
            ProxyKind::Http => "http",
        };
        Some(format!("{}://{}", scheme, self.address.trim()))
    }
}

/// Transfer timeouts handed to the fetch primitive (`[transfer]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    pub connect_timeout_secs: u64,
    /// Abort when the rate stays below this many bytes/sec for `low_speed_time_secs`.
    pub low_speed_limit_bytes: u32,
    pub low_speed_time_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
        }
    }
}

/// Global configuration loaded from `~/.config/chatex/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatexConfig {
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub transfer: Option<TransferConfig>,
}

impl ChatexConfig {
    /// Transfer settings, falling back to built-in defaults.
    pub fn transfer(&self) -> TransferConfig {
        self.transfer.clone().unwrap_or_default()
    }

    /// Proxy URL when a proxy section is present and enabled.
    pub fn proxy_url(&self) -> Option<String> {
        self.proxy.as_ref().and_then(ProxyConfig::url)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("chatex")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ChatexConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ChatexConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<ChatexConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: ChatexConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ChatexConfig::default();
        assert_eq!(cfg.download.max_concurrent_downloads, 3);
        assert_eq!(cfg.download.download_path, PathBuf::from("output/media"));
        assert_eq!(cfg.export.output_file, PathBuf::from("output/messages.html"));
        assert!(cfg.proxy.is_none());
        assert_eq!(cfg.transfer().connect_timeout_secs, 30);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = ChatexConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: ChatexConfig = toml::from_str(&toml).unwrap();
        assert_eq!(
            parsed.download.max_concurrent_downloads,
            cfg.download.max_concurrent_downloads
        );
        assert_eq!(parsed.download.download_path, cfg.download.download_path);
        assert_eq!(parsed.export.output_file, cfg.export.output_file);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            [download]
            max_concurrent_downloads = 0
            download_path = "/tmp/media"

            [export]
            output_file = "/tmp/out.html"
        "#;
        let cfg: ChatexConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.download.max_concurrent_downloads, 0);
        assert_eq!(cfg.download.download_path, PathBuf::from("/tmp/media"));
        assert_eq!(cfg.export.output_file, PathBuf::from("/tmp/out.html"));
        assert!(cfg.proxy_url().is_none());
    }

    #[test]
    fn config_toml_missing_sections_use_defaults() {
        let cfg: ChatexConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.download.max_concurrent_downloads, 3);
        assert_eq!(cfg.transfer().low_speed_time_secs, 60);
    }

    #[test]
    fn config_toml_proxy_and_transfer() {
        let toml = r#"
            [proxy]
            enable = true
            kind = "http"
            address = "127.0.0.1:8080"
            user = "u"
            password = "p"

            [transfer]
            connect_timeout_secs = 5
            low_speed_limit_bytes = 10
            low_speed_time_secs = 15
        "#;
        let cfg: ChatexConfig = toml::from_str(toml).unwrap();
        let proxy = cfg.proxy.as_ref().unwrap();
        assert_eq!(proxy.kind, ProxyKind::Http);
        assert_eq!(proxy.user.as_deref(), Some("u"));
        assert_eq!(cfg.proxy_url().as_deref(), Some("http://127.0.0.1:8080"));
        let transfer = cfg.transfer();
        assert_eq!(transfer.connect_timeout_secs, 5);
        assert_eq!(transfer.low_speed_limit_bytes, 10);
        assert_eq!(transfer.low_speed_time_secs, 15);
    }

    #[test]
    fn proxy_disabled_or_empty_has_no_url() {
        let mut proxy = ProxyConfig {
            enable: false,
            kind: ProxyKind::Socks5,
            address: "10.0.0.1:1080".to_string(),
            user: None,
            password: None,
        };
        assert!(proxy.url().is_none());
        proxy.enable = true;
        assert_eq!(proxy.url().as_deref(), Some("socks5h://10.0.0.1:1080"));
        proxy.address = "  ".to_string();
        assert!(proxy.url().is_none());
    }

    #[test]
    fn load_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[download]\nmax_concurrent_downloads = 7\ndownload_path = \"m\"\n")
            .unwrap();
        let cfg = load_from_path(&path).unwrap();
        assert_eq!(cfg.download.max_concurrent_downloads, 7);
    }

    #[test]
    fn load_from_path_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_from_path(&dir.path().join("nope.toml")).is_err());
    }
}
