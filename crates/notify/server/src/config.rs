//! Server configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default config file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "notify.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub database_url: String,
    pub push: PushConfig,
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Service account JSON key file.
    pub service_account_path: Option<PathBuf>,
    pub scope: String,
    pub request_timeout_secs: u64,
    /// Concurrent gateway requests per dispatch; 1 is sequential.
    pub max_in_flight: usize,
    pub refresh_margin_secs: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Sweep due reminders on this period. Unset disables the timer.
    pub interval_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: "notify.db".to_string(),
            push: PushConfig::default(),
            sweep: SweepConfig::default(),
        }
    }
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            service_account_path: None,
            scope: notify_push::FCM_SCOPE.to_string(),
            request_timeout_secs: 10,
            max_in_flight: notify_push::DEFAULT_MAX_IN_FLIGHT,
            refresh_margin_secs: notify_push::DEFAULT_REFRESH_MARGIN_SECS,
        }
    }
}

impl PushConfig {
    pub fn service_account_path(&self) -> Result<&Path, ConfigError> {
        self.service_account_path.as_deref().ok_or_else(|| {
            ConfigError::Invalid(
                "push.service_account_path is required (or set GOOGLE_APPLICATION_CREDENTIALS)"
                    .to_string(),
            )
        })
    }
}

impl Config {
    /// Load from `NOTIFY_CONFIG` (or `notify.toml`) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("NOTIFY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = Self::load_file(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Override keys from environment variables.
    pub fn apply_env(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = var("DATABASE_URL") {
            self.database_url = url;
        }

        if let Some(port) = var("PORT") {
            let port = port
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a port number: {port}")))?;
            self.listen_addr.set_port(port);
        }

        if let Some(path) = var("GOOGLE_APPLICATION_CREDENTIALS") {
            self.push.service_account_path = Some(PathBuf::from(path));
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.push.service_account_path()?;

        if self.push.max_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "push.max_in_flight must be at least 1".to_string(),
            ));
        }
        if self.push.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "push.request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.push.refresh_margin_secs < 0 {
            return Err(ConfigError::Invalid(
                "push.refresh_margin_secs must not be negative".to_string(),
            ));
        }
        if self.sweep.interval_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "sweep.interval_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
