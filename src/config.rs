//! Geocoder configuration, loaded from `~/.pinpoint/config.json`.
//!
//! Every field has a default, so an absent file or a partial file is fine.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::location::inference::BASELINE_COUNTRY;

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

/// Slack between the HTTP agent's timeout and the async deadline around a
/// lookup, so the blocking call has ended before the next variant starts.
pub const LOOKUP_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Additive acceptance heuristic for provider candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub country_bonus: f64,
    pub city_bonus: f64,
    pub postal_bonus: f64,
    pub first_attempt_bonus: f64,
    /// A candidate scoring strictly above this is accepted.
    pub accept_threshold: f64,
    /// From this attempt index on, any valid candidate is accepted.
    pub accept_any_from_attempt: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            country_bonus: 0.3,
            city_bonus: 0.3,
            postal_bonus: 0.2,
            first_attempt_bonus: 0.1,
            accept_threshold: 0.4,
            accept_any_from_attempt: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub user_agent: String,
    /// `accept-language` sent to the provider.
    pub language: String,
    pub result_limit: usize,
    pub request_timeout_ms: u64,
    /// Pause between two provider calls of the same resolution.
    pub rate_limit_delay_ms: u64,
    /// Primary market: the generic form default and the last-resort country.
    pub baseline_country: String,
    pub max_concurrent_resolutions: usize,
    pub scoring: ScoringConfig,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: format!("Pinpoint/{} (address-geocoder)", env!("CARGO_PKG_VERSION")),
            language: "en".to_string(),
            result_limit: 10,
            request_timeout_ms: 10_000,
            rate_limit_delay_ms: 150,
            baseline_country: BASELINE_COUNTRY.to_string(),
            max_concurrent_resolutions: 1,
            scoring: ScoringConfig::default(),
        }
    }
}

impl GeocoderConfig {
    /// Load from the default path; a missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path; the file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pinpoint")
            .join("config.json")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint must not be empty".into()));
        }
        if self.result_limit == 0 {
            return Err(ConfigError::Invalid("result_limit must be at least 1".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be at least 1".into()));
        }
        if self.max_concurrent_resolutions == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_resolutions must be at least 1".into(),
            ));
        }
        let s = &self.scoring;
        let weights = [
            s.country_bonus,
            s.city_bonus,
            s.postal_bonus,
            s.first_attempt_bonus,
            s.accept_threshold,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::Invalid(
                "scoring weights must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Async deadline for one lookup: the agent timeout plus [`LOOKUP_GRACE`].
    pub fn lookup_deadline(&self) -> Duration {
        self.request_timeout() + LOOKUP_GRACE
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}
