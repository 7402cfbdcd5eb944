use std::path::PathBuf;
use std::time::Duration;

use imgbench_client::api::DEFAULT_API_BASE;
use imgbench_sync::config::{SyncConfig, DEFAULT_POLL_INTERVAL, DEFAULT_RUN_LIMIT};

/// Watcher configuration loaded from environment variables.
///
/// All fields have defaults suitable for a backend running locally.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchConfig {
    /// Backend base URL (default: `http://127.0.0.1:8000`).
    pub api_base: String,
    /// Directory holding the cache blob (default: `.imgbench`).
    pub cache_dir: PathBuf,
    /// Delay between two polls of the same run (default: 800 ms).
    pub poll_interval: Duration,
    /// Page size for `GET /runs` (default: `200`).
    pub run_limit: usize,
    /// Per-request HTTP timeout (default: 30 s).
    pub request_timeout: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            cache_dir: PathBuf::from(".imgbench"),
            poll_interval: DEFAULT_POLL_INTERVAL,
            run_limit: DEFAULT_RUN_LIMIT,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl WatchConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                         | Default                  |
    /// |---------------------------------|--------------------------|
    /// | `IMGBENCH_API_BASE`             | `http://127.0.0.1:8000`  |
    /// | `IMGBENCH_CACHE_DIR`            | `.imgbench`              |
    /// | `IMGBENCH_POLL_INTERVAL_MS`     | `800`                    |
    /// | `IMGBENCH_RUN_LIMIT`            | `200`                    |
    /// | `IMGBENCH_REQUEST_TIMEOUT_SECS` | `30`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_base = match lookup("IMGBENCH_API_BASE") {
            Some(v) if v.trim().is_empty() => {
                return Err(ConfigError::Empty {
                    var: "IMGBENCH_API_BASE",
                })
            }
            Some(v) => v.trim().to_string(),
            None => defaults.api_base,
        };

        let cache_dir = lookup("IMGBENCH_CACHE_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        let poll_interval_ms: u64 = parse_var(
            &lookup,
            "IMGBENCH_POLL_INTERVAL_MS",
            defaults.poll_interval.as_millis() as u64,
        )?;
        if poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "IMGBENCH_POLL_INTERVAL_MS",
                value: "0".into(),
                expected: "a positive number of milliseconds",
            });
        }

        let run_limit = parse_var(&lookup, "IMGBENCH_RUN_LIMIT", defaults.run_limit)?;
        let request_timeout_secs = parse_var(
            &lookup,
            "IMGBENCH_REQUEST_TIMEOUT_SECS",
            defaults.request_timeout.as_secs(),
        )?;

        Ok(Self {
            api_base,
            cache_dir,
            poll_interval: Duration::from_millis(poll_interval_ms),
            run_limit,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }

    /// Session tunables derived from this configuration.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            poll_interval: self.poll_interval,
            run_limit: self.run_limit,
            ..SyncConfig::default()
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            value: raw,
            expected: "a non-negative integer",
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must not be empty")]
    Empty { var: &'static str },

    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}
