//! Resolver configuration
//!
//! Loaded from YAML. Every section is optional; missing values fall back to
//! defaults, some of which read the environment (`DATABASE_URL`,
//! `DATABASE_POOL_SIZE`, `GOOGLE_API_KEY`).

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub subpremise: SubpremisePolicy,
    pub geocode: GeocodeConfig,
    pub resolver: EntityResolverConfig,
    pub database: DatabaseConfig,
}

/// How to reconcile a caller's subpremise with one the geocoder disagrees on.
///
/// When several flags are set they apply in field order: ignore-missing,
/// then retry-with-replace, then replace-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SubpremisePolicy {
    /// Keep the caller's subpremise when the geocoder returns none
    pub ignore_missing_subpremise: bool,
    /// Re-query once with the caller's subpremise spliced into the geocoded address
    pub subpremise_retry_with_replace: bool,
    /// Overwrite the geocoded subpremise with the caller's, no second query
    pub subpremise_replace_only: bool,
}

impl SubpremisePolicy {
    pub fn is_any_enabled(&self) -> bool {
        self.ignore_missing_subpremise
            || self.subpremise_retry_with_replace
            || self.subpremise_replace_only
    }
}

/// Geocoding backend settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    /// Budget for one assignment's lookups, retry included
    #[serde(with = "duration_ms", rename = "timeout_ms")]
    pub timeout: Duration,
    /// Raw strings with fewer tokens are not geocoded
    pub min_raw_tokens: usize,
}

pub const GOOGLE_GEOCODE_API: &str = "https://maps.googleapis.com/maps/api/geocode/json";

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: std::env::var("GOOGLE_API_KEY").ok(),
            base_url: GOOGLE_GEOCODE_API.to_string(),
            timeout: Duration::from_secs(5),
            // "number street city state country"
            min_raw_tokens: 5,
        }
    }
}

/// Entity resolver settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EntityResolverConfig {
    /// Attempts per get-or-create step before reporting a persistence conflict
    pub max_conflict_attempts: u32,
}

impl Default for EntityResolverConfig {
    fn default() -> Self {
        Self {
            max_conflict_attempts: 3,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    #[serde(with = "duration_ms", rename = "connection_timeout_ms")]
    pub connection_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost:5432/addresses".to_string()),
            max_connections: std::env::var("DATABASE_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            connection_timeout: Duration::from_secs(30),
        }
    }
}

impl ResolverConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
