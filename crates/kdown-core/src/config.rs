use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Hard bounds for the concurrent transfer budget.
pub const MIN_CONNECTIONS: usize = 1;
pub const MAX_CONNECTIONS: usize = 20;

/// Clamp a requested connection count into `[1, 20]`.
pub fn clamp_connections(n: usize) -> usize {
    n.clamp(MIN_CONNECTIONS, MAX_CONNECTIONS)
}

/// Backoff parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

/// libcurl tuning (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    /// Abort a transfer whose throughput stays below this many bytes/s ...
    pub low_speed_limit: u32,
    /// ... for this many seconds.
    pub low_speed_time_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
            low_speed_limit: 1024,
            low_speed_time_secs: 60,
            user_agent: None,
        }
    }
}

/// When progress events fire during a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressMode {
    /// Emit whenever the integer percentage changes.
    #[default]
    Percentage,
    /// Emit at most once per `min_progress_interval_ms`.
    Interval,
}

/// Global configuration loaded from `~/.config/kdown/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdownConfig {
    /// Maximum simultaneous transfers. Clamped to [1, 20] at use.
    pub max_connections: usize,
    /// Default per-task retry budget for recoverable failures.
    pub retry_times: u32,
    #[serde(default)]
    pub progress_mode: ProgressMode,
    /// Minimum spacing of progress events in `interval` mode.
    pub min_progress_interval_ms: u64,
    /// Optional backoff policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Optional curl tuning; if missing, built-in defaults are used.
    #[serde(default)]
    pub http: Option<HttpConfig>,
}

impl Default for KdownConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            retry_times: 3,
            progress_mode: ProgressMode::Percentage,
            min_progress_interval_ms: 5_000,
            retry: None,
            http: None,
        }
    }
}

impl KdownConfig {
    pub fn effective_max_connections(&self) -> usize {
        clamp_connections(self.max_connections)
    }

    pub fn min_progress_interval(&self) -> Duration {
        Duration::from_millis(self.min_progress_interval_ms)
    }

    pub fn http_or_default(&self) -> HttpConfig {
        self.http.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("kdown")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<KdownConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = KdownConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: KdownConfig = toml::from_str(&data)?;
    Ok(cfg)
}
