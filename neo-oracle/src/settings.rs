//! Oracle service settings.
//!
//! Loaded from TOML; every field has a default so a partial file is valid.
//! Durations are written in milliseconds.

use crate::payloads::MAX_RESULT_SIZE;
use crate::service::OracleServiceError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default timeout of a single HTTPS fetch.
pub const DEFAULT_ORACLE_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default upper bound on the whole URL processing step.
pub const DEFAULT_MAX_ORACLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Default lifetime of a task that never received its request.
pub const DEFAULT_MAX_TASK_TIMEOUT: Duration = Duration::from_millis(432_000_000);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3 * 60);
pub const DEFAULT_FINISHED_CACHE_TTL: Duration = Duration::from_secs(3 * 24 * 60 * 60);
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 16;

/// Chain fee constants used to price a response transaction.
///
/// These mirror the policy contract and the oracle contract's verification
/// cost; every committee member must use identical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeePolicy {
    /// Multiplier applied to VM opcode prices.
    pub exec_fee_factor: i64,
    /// Network fee charged per transaction byte.
    pub fee_per_byte: i64,
    /// GAS consumed by the oracle contract's `verify` method.
    pub oracle_verification_fee: i64,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            exec_fee_factor: 30,
            fee_per_byte: 1000,
            oracle_verification_fee: 1_000_060,
        }
    }
}

/// Oracle service configuration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleServiceSettings {
    /// Network magic mixed into every signature.
    pub network: u32,
    pub allow_private_host: bool,
    /// Accepted response media types; empty accepts any.
    pub allowed_content_types: Vec<String>,
    /// Only URLs containing one of these are allowed (empty = allow all non-blocked).
    pub url_whitelist: Vec<String>,
    /// URLs containing any of these are blocked.
    pub url_blacklist: Vec<String>,
    #[serde(with = "duration_ms")]
    pub https_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub max_oracle_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub max_task_timeout: Duration,
    /// Maximum response body size in bytes.
    pub max_response_size: usize,
    pub max_concurrent_fetches: usize,
    #[serde(with = "duration_ms")]
    pub poll_interval: Duration,
    #[serde(with = "duration_ms")]
    pub refresh_interval: Duration,
    #[serde(with = "duration_ms")]
    pub finished_cache_ttl: Duration,
    pub fee: FeePolicy,
}

impl Default for OracleServiceSettings {
    fn default() -> Self {
        Self {
            network: 860_833_102,
            allow_private_host: false,
            allowed_content_types: Vec::new(),
            url_whitelist: Vec::new(),
            url_blacklist: Vec::new(),
            https_timeout: DEFAULT_ORACLE_REQUEST_TIMEOUT,
            max_oracle_timeout: DEFAULT_MAX_ORACLE_TIMEOUT,
            max_task_timeout: DEFAULT_MAX_TASK_TIMEOUT,
            max_response_size: MAX_RESULT_SIZE,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            poll_interval: DEFAULT_POLL_INTERVAL,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            finished_cache_ttl: DEFAULT_FINISHED_CACHE_TTL,
            fee: FeePolicy::default(),
        }
    }
}

impl OracleServiceSettings {
    /// Parses settings from TOML and normalizes them.
    pub fn from_toml_str(text: &str) -> Result<Self, OracleServiceError> {
        let mut settings: Self =
            toml::from_str(text).map_err(|err| OracleServiceError::Config(err.to_string()))?;
        settings.normalize();
        Ok(settings)
    }

    /// Reads and parses a TOML settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OracleServiceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            OracleServiceError::Config(format!("{}: {err}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Returns true if a content type is allowed.
    pub fn is_content_type_allowed(&self, content_type: &str) -> bool {
        self.allowed_content_types.is_empty()
            || self
                .allowed_content_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(content_type))
    }

    /// Validates a URL against whitelist and blacklist.
    pub fn is_url_allowed(&self, url: &str) -> bool {
        if self.url_blacklist.iter().any(|blocked| url.contains(blocked)) {
            return false;
        }
        self.url_whitelist.is_empty()
            || self
                .url_whitelist
                .iter()
                .any(|allowed| url.contains(allowed))
    }

    /// Repairs zero or out-of-range values.
    pub fn normalize(&mut self) {
        if self.max_response_size == 0 || self.max_response_size > MAX_RESULT_SIZE {
            self.max_response_size = MAX_RESULT_SIZE;
        }
        if self.https_timeout.is_zero() {
            self.https_timeout = DEFAULT_ORACLE_REQUEST_TIMEOUT;
        }
        if self.max_oracle_timeout < self.https_timeout {
            self.max_oracle_timeout = self.https_timeout;
        }
        if self.max_task_timeout.is_zero() {
            self.max_task_timeout = DEFAULT_MAX_TASK_TIMEOUT;
        }
        if self.max_concurrent_fetches == 0 {
            self.max_concurrent_fetches = DEFAULT_MAX_CONCURRENT_FETCHES;
        }
        if self.poll_interval.is_zero() {
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        if self.refresh_interval.is_zero() {
            self.refresh_interval = DEFAULT_REFRESH_INTERVAL;
        }
        if self.finished_cache_ttl.is_zero() {
            self.finished_cache_ttl = DEFAULT_FINISHED_CACHE_TTL;
        }
        self.allowed_content_types
            .retain(|content_type| !content_type.trim().is_empty());
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
