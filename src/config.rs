//! Fetcher configuration, persisted as TOML.
//!
//! The file lives at `$XDG_CONFIG_HOME/hn-tabular/config.toml` unless a path
//! is passed explicitly. Every field has a default, so an empty or missing
//! file yields a working configuration against the public Algolia API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable that overrides `base_url`.
pub const BASE_URL_ENV: &str = "HN_TABULAR_BASE_URL";

/// Errors from loading or validating the configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(hn::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(hn::config::parse),
        help("Check the TOML syntax and field types in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("invalid base URL \"{url}\": {message}")]
    #[diagnostic(
        code(hn::config::base_url),
        help("Use an absolute http(s) URL such as https://hn.algolia.com/api/v1")
    )]
    InvalidBaseUrl { url: String, message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Retry behaviour of the upstream HTTP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay; retry `n` (0-based) sleeps `backoff_ms * 2^n`.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// HTTP statuses worth retrying.
    #[serde(default = "default_status_forcelist")]
    pub status_forcelist: Vec<u16>,
}

fn default_max_retries() -> u32 {
    3
}
fn default_backoff_ms() -> u64 {
    300
}
fn default_status_forcelist() -> Vec<u16> {
    vec![500, 502, 504]
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            status_forcelist: default_status_forcelist(),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }

    pub fn retries_status(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }
}

/// Configuration for the upstream search client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// API root; `/search` and `/search_by_date` are appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_base_url() -> String {
    "https://hn.algolia.com/api/v1".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("hn-tabular/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            retry: RetryPolicy::default(),
        }
    }
}

impl FetcherConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Resolve the effective configuration.
    ///
    /// An explicit path must exist. Otherwise the default location is used
    /// when present, and built-in defaults when not. `HN_TABULAR_BASE_URL`
    /// is applied last.
    pub fn resolve(explicit: Option<&Path>) -> ConfigResult<Self> {
        Self::resolve_from(
            explicit,
            default_config_file().as_deref(),
            std::env::var(BASE_URL_ENV).ok(),
        )
    }

    fn resolve_from(
        explicit: Option<&Path>,
        default_file: Option<&Path>,
        env_base_url: Option<String>,
    ) -> ConfigResult<Self> {
        let mut config = match (explicit, default_file) {
            (Some(path), _) => Self::load(path)?,
            (None, Some(path)) if path.is_file() => Self::load(path)?,
            _ => Self::default(),
        };
        if let Some(base_url) = env_base_url.filter(|url| !url.trim().is_empty()) {
            config.base_url = base_url;
        }
        Ok(config)
    }

    /// Parsed `base_url`, with any trailing slash removed from the path.
    pub fn api_root(&self) -> ConfigResult<Url> {
        let invalid = |message: String| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            message,
        };
        let mut url = Url::parse(self.base_url.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme \"{}\"", url.scheme())));
        }
        let path = url.path().trim_end_matches('/').to_string();
        url.set_path(&path);
        url.set_query(None);
        Ok(url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `$XDG_CONFIG_HOME/hn-tabular/config.toml`, falling back to `~/.config`.
pub fn default_config_file() -> Option<PathBuf> {
    config_file_under(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

fn config_file_under(xdg_config_home: Option<PathBuf>, home: Option<PathBuf>) -> Option<PathBuf> {
    let config_home = xdg_config_home
        .filter(|dir| !dir.as_os_str().is_empty())
        .or_else(|| home.map(|home| home.join(".config")))?;
    Some(config_home.join("hn-tabular").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_public_api() {
        let config = FetcherConfig::default();
        assert_eq!(config.base_url, "https://hn.algolia.com/api/v1");
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.status_forcelist, vec![500, 502, 504]);
        assert!(config.user_agent.starts_with("hn-tabular/"));
    }

    #[test]
    fn backoff_doubles_from_base() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.backoff(0), Duration::from_millis(300));
        assert_eq!(retry.backoff(1), Duration::from_millis(600));
        assert_eq!(retry.backoff(2), Duration::from_millis(1200));
        // Absurd retry counts saturate instead of overflowing.
        assert_eq!(retry.backoff(200), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn retries_only_listed_statuses() {
        let retry = RetryPolicy::default();
        assert!(retry.retries_status(502));
        assert!(!retry.retries_status(503));
        assert!(!retry.retries_status(404));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config =
            FetcherConfig::from_toml("timeout_secs = 5\n[retry]\nmax_retries = 1\n").unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.backoff_ms, 300);
        assert_eq!(config.base_url, "https://hn.algolia.com/api/v1");
    }

    #[test]
    fn load_reads_file_and_reports_bad_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = dir.path().join("config.toml");
        std::fs::write(&good, "base_url = \"http://127.0.0.1:9/api\"\n").unwrap();
        let config = FetcherConfig::load(&good).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9/api");

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "timeout_secs = \"soon\"\n").unwrap();
        assert!(matches!(
            FetcherConfig::load(&bad),
            Err(ConfigError::Parse { .. })
        ));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            FetcherConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn config_file_prefers_xdg_then_home() {
        assert_eq!(
            config_file_under(Some("/xdg".into()), Some("/home/u".into())),
            Some(PathBuf::from("/xdg/hn-tabular/config.toml"))
        );
        assert_eq!(
            config_file_under(Some("".into()), Some("/home/u".into())),
            Some(PathBuf::from("/home/u/.config/hn-tabular/config.toml"))
        );
        assert_eq!(config_file_under(None, None), None);
    }

    #[test]
    fn resolve_layers_file_and_env_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = config_file_under(Some(dir.path().to_path_buf()), None).unwrap();
        let default = Some(file.as_path());

        // No file yet: built-in defaults.
        let config = FetcherConfig::resolve_from(None, default, None).unwrap();
        assert_eq!(config, FetcherConfig::default());

        std::fs::create_dir_all(dir.path().join("hn-tabular")).unwrap();
        std::fs::write(&file, "base_url = \"http://127.0.0.1:9/api\"\ntimeout_secs = 7\n").unwrap();
        let config = FetcherConfig::resolve_from(None, default, None).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9/api");
        assert_eq!(config.timeout_secs, 7);

        let env = Some("http://localhost:8080/v1".to_string());
        let config = FetcherConfig::resolve_from(None, default, env).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.timeout_secs, 7);

        let blank = Some("  ".to_string());
        let config = FetcherConfig::resolve_from(None, default, blank).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9/api");

        // An explicit path wins over the default location and must exist.
        let explicit = dir.path().join("other.toml");
        assert!(matches!(
            FetcherConfig::resolve_from(Some(explicit.as_path()), default, None),
            Err(ConfigError::Read { .. })
        ));
        std::fs::write(&explicit, "timeout_secs = 2\n").unwrap();
        let config = FetcherConfig::resolve_from(Some(explicit.as_path()), default, None).unwrap();
        assert_eq!(config.timeout_secs, 2);
        assert_eq!(config.base_url, "https://hn.algolia.com/api/v1");
    }

    #[test]
    fn api_root_normalizes_trailing_slash() {
        let config = FetcherConfig {
            base_url: "https://hn.algolia.com/api/v1/".into(),
            ..Default::default()
        };
        assert_eq!(
            config.api_root().unwrap().as_str(),
            "https://hn.algolia.com/api/v1"
        );
    }

    #[test]
    fn api_root_rejects_non_http() {
        for base_url in ["ftp://example.com/api", "not a url"] {
            let config = FetcherConfig {
                base_url: base_url.into(),
                ..Default::default()
            };
            assert!(matches!(
                config.api_root(),
                Err(ConfigError::InvalidBaseUrl { .. })
            ));
        }
    }
}
