//! Geocode gateway
//!
//! The narrow boundary to the external geocoding service: one query string in,
//! at most one structured result out. No retries happen behind this trait.

pub mod client;
pub mod scripted;
pub mod types;

use address_types::AddressComponents;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use client::GoogleGeocoder;
pub use scripted::{ScriptedAnswer, ScriptedGateway};

/// A single geocoded address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub street_number: Option<String>,
    pub route: Option<String>,
    pub subpremise: Option<String>,
    pub locality: Option<String>,
    pub postal_code: Option<String>,
    pub state: Option<String>,
    pub state_code: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// The backend matched only part of the query
    #[serde(default)]
    pub partial_match: bool,
}

impl GeocodeResult {
    pub fn has_coordinates(&self) -> bool {
        matches!((self.latitude, self.longitude), (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite())
    }

    /// Structured components for this result. `raw` is the caller's string
    /// and is never replaced by the geocoded text.
    pub fn to_components(&self, raw: &str) -> AddressComponents {
        AddressComponents {
            raw: raw.to_string(),
            street_number: self.street_number.clone(),
            route: self.route.clone(),
            subpremise: self.subpremise.clone(),
            locality: self.locality.clone(),
            postal_code: self.postal_code.clone(),
            state: self.state.clone(),
            state_code: self.state_code.clone(),
            country: self.country.clone(),
            country_code: self.country_code.clone(),
            formatted: Some(self.formatted_address.clone()).filter(|f| !f.is_empty()),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Outcome of a lookup that reached the backend
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeLookup {
    Found(GeocodeResult),
    NotFound,
}

/// Gateway failures. The resolution engine treats all of them as not-found.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Geocoder unavailable: {0}")]
    Unavailable(String),

    #[error("Geocoder timed out after {0:?}")]
    Timeout(Duration),

    #[error("Geocoder returned {0} results")]
    AmbiguousResult(usize),

    #[error("Only an approximate match ({location_type}) was found")]
    Approximate { location_type: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed geocoder response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Query interface to a geocoding backend
#[async_trait]
pub trait GeocodeGateway: Send + Sync {
    /// Look up a single address. `timeout` bounds this call only.
    async fn lookup(&self, query: &str, timeout: Duration) -> Result<GeocodeLookup, GeocodeError>;
}

/// Look up `query` within whatever remains of `deadline`.
///
/// Timeouts and gateway errors are logged and reported as `None`, exactly
/// like a not-found answer.
pub async fn lookup_before(
    gateway: &dyn GeocodeGateway,
    query: &str,
    deadline: tokio::time::Instant,
) -> Option<GeocodeResult> {
    let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
    if remaining.is_zero() {
        tracing::warn!(query, "Geocode budget exhausted before lookup");
        return None;
    }

    match tokio::time::timeout(remaining, gateway.lookup(query, remaining)).await {
        Ok(Ok(GeocodeLookup::Found(result))) => Some(result),
        Ok(Ok(GeocodeLookup::NotFound)) => {
            tracing::debug!(query, "Geocoder found no match");
            None
        }
        Ok(Err(e)) => {
            tracing::warn!(query, error = %e, "Geocode lookup failed, treating as not found");
            None
        }
        Err(_) => {
            tracing::warn!(query, timeout = ?remaining, "Geocode lookup timed out, treating as not found");
            None
        }
    }
}
