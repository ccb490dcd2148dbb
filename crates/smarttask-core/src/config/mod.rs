use crate::error::{Result, SmartTaskError};
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "SMARTTASK_API_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartTaskConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Retries for idempotent reads. Writes are never retried.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Custom path for the session file. Defaults to `~/.config/smarttask/session.json`.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_datetime_format")]
    pub datetime_format: String,
    /// How many tasks the dashboard lists under "recent".
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            datetime_format: default_datetime_format(),
            recent_limit: default_recent_limit(),
        }
    }
}

// -- Defaults --

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_max_retries() -> usize {
    2
}
fn default_retry_base_delay_ms() -> u64 {
    200
}
fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}
fn default_datetime_format() -> String {
    "%d/%m/%Y %H:%M".to_string()
}
fn default_recent_limit() -> usize {
    5
}

impl SmartTaskConfig {
    /// Load configuration with three-layer TOML merge:
    /// 1. ~/.config/smarttask/config.toml (global)
    /// 2. .smarttask/config.toml (project)
    /// 3. .smarttask/config.local.toml (local, gitignored)
    ///
    /// `SMARTTASK_API_URL` overrides the base URL afterwards.
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(dir) = project_dir {
            let project_config = dir.join(".smarttask").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }

            let local_config = dir.join(".smarttask").join("config.local.toml");
            if local_config.exists() {
                builder = builder.add_source(File::from(local_config).required(false));
            }
        }

        let config = builder
            .build()
            .map_err(|e| SmartTaskError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| SmartTaskError::Config(e.to_string()))?;

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                cfg.api.base_url = url.trim().to_string();
            }
        }

        cfg.validate();
        Ok(cfg)
    }

    /// Defaults only (no files).
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Validate config values, fixing out-of-range ones and logging warnings.
    /// Lenient: it repairs the config rather than rejecting it.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        let trimmed = self.api.base_url.trim().trim_end_matches('/').to_string();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            warnings.push(format!(
                "api.base_url '{}' is not an http(s) URL, using {}",
                self.api.base_url,
                default_base_url()
            ));
            self.api.base_url = default_base_url();
        } else {
            self.api.base_url = trimmed;
        }

        if self.api.timeout_secs == 0 {
            warnings.push("api.timeout_secs = 0, setting to 1".to_string());
            self.api.timeout_secs = 1;
        }
        if self.api.connect_timeout_secs == 0 {
            warnings.push("api.connect_timeout_secs = 0, setting to 1".to_string());
            self.api.connect_timeout_secs = 1;
        }
        if self.api.max_retries > 10 {
            warnings.push(format!(
                "api.max_retries = {} is excessive, clamping to 10",
                self.api.max_retries
            ));
            self.api.max_retries = 10;
        }
        if self.display.recent_limit == 0 {
            warnings.push("display.recent_limit = 0, setting to 1".to_string());
            self.display.recent_limit = 1;
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }

    /// Render as TOML, e.g. for `smarttask config`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SmartTaskError::Config(format!("failed to serialize config: {e}")))
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("smarttask").join("config.toml"))
}
