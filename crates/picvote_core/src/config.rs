//! Application configuration.
//!
//! # Responsibility
//! - Provide defaults that run fully offline.
//! - Merge an optional JSON config file, then environment overrides.
//! - Build the runtime collaborators that depend on configuration.
//!
//! # Invariants
//! - Missing file fields fall back to defaults.
//! - Environment variables win over file values.
//! - The Gemini API key is never included in `Debug` output.

use crate::logging::default_log_level;
use crate::remote::gemini::{DisabledAnalyzer, GeminiAnalyzer};
use crate::remote::local_gallery::SimulatedLatency;
use crate::remote::ImageAnalyzer;
use crate::sync::retry::RetryPolicy;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DB_FILE_NAME: &str = "picvote.sqlite3";
const DEFAULT_DATA_DIR_NAME: &str = ".picvote";

pub const ENV_DATA_DIR: &str = "PICVOTE_DATA_DIR";
pub const ENV_LOG_LEVEL: &str = "PICVOTE_LOG_LEVEL";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "API_KEY";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

/// Retry knobs for the vote sync queue, in config-file units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl Debug for GeminiSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub log_level: String,
    /// Defaults to `<data_dir>/logs`.
    pub log_dir: Option<PathBuf>,
    /// Adds demo network delays to the local gallery service.
    pub simulate_latency: bool,
    pub retry: RetrySettings,
    pub gemini: GeminiSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level().to_string(),
            log_dir: None,
            simulate_latency: false,
            retry: RetrySettings::default(),
            gemini: GeminiSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads defaults, the optional file, then process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies overrides from `lookup`, which maps variable names to values.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = non_blank(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(level) = non_blank(ENV_LOG_LEVEL) {
            self.log_level = level.trim().to_string();
        }
        if let Some(key) = non_blank(ENV_GEMINI_API_KEY).or_else(|| non_blank(ENV_API_KEY_FALLBACK))
        {
            self.gemini.api_key = Some(key.trim().to_string());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_dir cannot be empty".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Invalid(
                "retry.base_delay_ms cannot exceed retry.max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("logs"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn latency(&self) -> SimulatedLatency {
        if self.simulate_latency {
            SimulatedLatency::demo()
        } else {
            SimulatedLatency::none()
        }
    }

    /// Gemini analyzer when a key is configured, otherwise a no-op analyzer.
    pub fn analyzer(&self) -> Arc<dyn ImageAnalyzer> {
        match self.gemini.api_key.as_deref() {
            Some(key) => Arc::new(GeminiAnalyzer::new(key, self.gemini.model.clone())),
            None => Arc::new(DisabledAnalyzer),
        }
    }
}

fn default_data_dir() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| std::env::temp_dir())
        .join(DEFAULT_DATA_DIR_NAME)
}
