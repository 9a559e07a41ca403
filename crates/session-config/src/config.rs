//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default remote service base (can be overridden at compile time via
/// SESSIONCTL_API_BASE_URL).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("SESSIONCTL_API_BASE_URL") {
    Some(url) => url,
    None => "http://localhost:8080",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_STATUS_PATH: &str = "/api/auth/status";
pub const DEFAULT_LOGIN_PATH: &str = "/api/auth/github";
pub const DEFAULT_LOGOUT_PATH: &str = "/api/auth/logout";

const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 2_000;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Which credential representation is authoritative for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialMode {
    /// The session rides on a cookie held by the HTTP client.
    Cookie,
    /// An explicit bearer token from durable storage.
    #[default]
    Bearer,
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL of the remote authentication service.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_status_path")]
    pub status_path: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_logout_path")]
    pub logout_path: String,
    /// Where to send the user after logout. Falls back to the base URL.
    #[serde(default)]
    pub post_logout_url: Option<String>,
    #[serde(default)]
    pub credential_mode: CredentialMode,
    /// Wait after an `auth=success` redirect before the first status query.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Fixed wait between status attempts.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Retry budget per determination cycle.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_status_path() -> String {
    DEFAULT_STATUS_PATH.to_string()
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

fn default_logout_path() -> String {
    DEFAULT_LOGOUT_PATH.to_string()
}

fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            status_path: default_status_path(),
            login_path: default_login_path(),
            logout_path: default_logout_path(),
            post_logout_url: None,
            credential_mode: CredentialMode::default(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("SESSIONCTL_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(base) = std::env::var("SESSIONCTL_API_BASE_URL") {
            if !base.trim().is_empty() {
                self.api_base_url = base;
            }
        }
    }

    /// Reject values the controller cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        let base = self.api_base_url()?;
        if base.cannot_be_a_base() {
            return Err(CoreError::Config(format!(
                "api_base_url cannot be used as a base: {}",
                self.api_base_url
            )));
        }
        if let Some(target) = &self.post_logout_url {
            Url::parse(target)?;
        }
        if self.request_timeout_ms == 0 {
            return Err(CoreError::Config(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the base URL as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    fn endpoint(&self, path: &str) -> CoreResult<Url> {
        Ok(self.api_base_url()?.join(path)?)
    }

    pub fn status_url(&self) -> CoreResult<Url> {
        self.endpoint(&self.status_path)
    }

    pub fn login_url(&self) -> CoreResult<Url> {
        self.endpoint(&self.login_path)
    }

    pub fn logout_url(&self) -> CoreResult<Url> {
        self.endpoint(&self.logout_path)
    }

    /// Post-logout destination, or the service base when none is configured.
    pub fn post_logout_url(&self) -> CoreResult<Url> {
        match &self.post_logout_url {
            Some(target) => Ok(Url::parse(target)?),
            None => self.api_base_url(),
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
