//! CLI configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use vouch_attestation::RetryPolicy;
use vouch_types::{QuorumPolicy, VerificationParams};
use vouch_utils::LogFormat;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Configuration for the `vouch` CLI.
///
/// Loaded from a TOML file via [`VouchConfig::from_toml_file`]; every field
/// has a default, so an empty file is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VouchConfig {
    /// Approval threshold policy.
    #[serde(default)]
    pub quorum: QuorumPolicy,

    /// Double-submission window in seconds.
    #[serde(default = "default_dedupe_window_secs")]
    pub dedupe_window_secs: u64,

    #[serde(default)]
    pub attestation: AttestationConfig,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// JSON file holding requests, confirmations, and certificates.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

/// Where and how certificates are attested.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationConfig {
    /// Base URL of the attestation service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Upper bound on one attestation attempt.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Extra attempts after a transient failure.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Delay before the first retry; doubles per retry.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_dedupe_window_secs() -> u64 {
    VerificationParams::default().dedupe_window_secs
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from("vouch-state.json")
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8700".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    200
}

// ── Impl ───────────────────────────────────────────────────────────────

impl VouchConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn verification_params(&self) -> VerificationParams {
        VerificationParams {
            quorum: self.quorum,
            dedupe_window_secs: self.dedupe_window_secs,
        }
    }
}

impl AttestationConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(self.timeout_ms),
            retries: self.retries,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

impl Default for VouchConfig {
    fn default() -> Self {
        Self {
            quorum: QuorumPolicy::default(),
            dedupe_window_secs: default_dedupe_window_secs(),
            attestation: AttestationConfig::default(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            state_file: default_state_file(),
        }
    }
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}
