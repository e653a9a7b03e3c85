//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [api]
//! url = "https://groupsave.example/api/"
//! timeout_secs = 30
//!
//! [session]
//! expiry_margin_secs = 30
//! poll_interval_secs = 60
//!
//! [cache]
//! dashboard_ttl_secs = 30
//!
//! [storage]
//! data_dir = "/var/lib/groupsave"
//!
//! [logging]
//! level = "info"
//! file = true
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// API base URL used when nothing is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/";

/// Environment variable overriding `[api] url`.
pub const API_URL_ENV: &str = "GROUPSAVE_API_URL";

const APP_NAME: &str = "groupsave";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSaveConfig {
    pub api: Option<ApiConfig>,
    pub session: Option<SessionSection>,
    pub cache: Option<CacheSection>,
    pub storage: Option<StorageConfig>,
    pub logging: Option<LoggingConfig>,
}

impl GroupSaveConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections merge field by field, so a project file that only sets
    /// `[api] url` keeps the user's `[api] timeout_secs`.
    pub fn merge(&mut self, other: GroupSaveConfig) {
        merge_section(&mut self.api, other.api, ApiConfig::merge);
        merge_section(&mut self.session, other.session, SessionSection::merge);
        merge_section(&mut self.cache, other.cache, CacheSection::merge);
        merge_section(&mut self.storage, other.storage, StorageConfig::merge);
        merge_section(&mut self.logging, other.logging, LoggingConfig::merge);
    }

    fn validate(&self) -> Result<()> {
        if let Some(session) = &self.session
            && session.poll_interval_secs == Some(0)
        {
            return Err(ConfigError::InvalidValue {
                field: "session.poll_interval_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some(api) = &self.api
            && api.timeout_secs == Some(0)
        {
            return Err(ConfigError::InvalidValue {
                field: "api.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    // ── Effective values ──────────────────────────────────────────────────

    /// API base URL: `GROUPSAVE_API_URL`, then `[api] url`, then the default.
    pub fn api_url(&self) -> String {
        if let Ok(url) = std::env::var(API_URL_ENV)
            && !url.is_empty()
        {
            return url;
        }
        self.api
            .as_ref()
            .and_then(|a| a.url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn api_timeout(&self) -> Duration {
        secs(self.api.as_ref().and_then(|a| a.timeout_secs), 30)
    }

    pub fn expiry_margin(&self) -> Duration {
        secs(self.session.as_ref().and_then(|s| s.expiry_margin_secs), 30)
    }

    pub fn poll_interval(&self) -> Duration {
        secs(self.session.as_ref().and_then(|s| s.poll_interval_secs), 60)
    }

    pub fn dashboard_ttl(&self) -> Duration {
        secs(self.cache.as_ref().and_then(|c| c.dashboard_ttl_secs), 30)
    }

    /// Where the session store lives: `[storage] data_dir`, then the
    /// platform data directory.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.storage
            .as_ref()
            .and_then(|s| s.data_dir.clone())
            .or_else(|| dirs::data_dir().map(|d| d.join(APP_NAME)))
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    /// Whether to write JSON log files. On unless disabled.
    pub fn log_to_file(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.file).unwrap_or(true)
    }
}

fn secs(value: Option<u64>, default: u64) -> Duration {
    Duration::from_secs(value.unwrap_or(default))
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
    match (base.as_mut(), other) {
        (Some(b), Some(o)) => merge(b, o),
        (None, Some(o)) => *base = Some(o),
        (_, None) => {}
    }
}

fn take<T>(base: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *base = other;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// `[api]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL all endpoint paths are joined to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Per-request timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ApiConfig {
    fn merge(&mut self, other: Self) {
        take(&mut self.url, other.url);
        take(&mut self.timeout_secs, other.timeout_secs);
    }
}

/// `[session]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// How long before the token's expiry the session is ended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_margin_secs: Option<u64>,
    /// Interval of the safety-net expiry check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
}

impl SessionSection {
    fn merge(&mut self, other: Self) {
        take(&mut self.expiry_margin_secs, other.expiry_margin_secs);
        take(&mut self.poll_interval_secs, other.poll_interval_secs);
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_ttl_secs: Option<u64>,
}

impl CacheSection {
    fn merge(&mut self, other: Self) {
        take(&mut self.dashboard_ttl_secs, other.dashboard_ttl_secs);
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    fn merge(&mut self, other: Self) {
        take(&mut self.data_dir, other.data_dir);
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console filter directive, e.g. `info` or `groupsave_session=debug`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Write JSON logs under the config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<bool>,
}

impl LoggingConfig {
    fn merge(&mut self, other: Self) {
        take(&mut self.level, other.level);
        take(&mut self.file, other.file);
    }
}
