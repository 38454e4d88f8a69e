//! Google Geocoding API client

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::types::{GeocodeResponse, PRECISE_LOCATION_TYPE};
use super::{GeocodeError, GeocodeGateway, GeocodeLookup};
use crate::config::GeocodeConfig;

pub struct GoogleGeocoder {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(config: &GeocodeConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .context("GOOGLE_API_KEY is not configured")?;
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid geocoder base URL: {}", config.base_url))?;
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn request_url(&self, query: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("address", query)
            .append_pair("key", &self.api_key);
        url
    }
}

#[async_trait]
impl GeocodeGateway for GoogleGeocoder {
    async fn lookup(&self, query: &str, timeout: Duration) -> Result<GeocodeLookup, GeocodeError> {
        let response = self
            .client
            .get(self.request_url(query))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeocodeError::Timeout(timeout)
                } else {
                    GeocodeError::Http(e)
                }
            })?;

        if !response.status().is_success() {
            return Err(GeocodeError::Unavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let parsed: GeocodeResponse = serde_json::from_str(&body)?;
        interpret(parsed)
    }
}

/// Reduce an API response to at most one precise result
pub(crate) fn interpret(response: GeocodeResponse) -> Result<GeocodeLookup, GeocodeError> {
    match response.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(GeocodeLookup::NotFound),
        status => {
            let detail = response
                .error_message
                .map(|m| format!("{}: {}", status, m))
                .unwrap_or_else(|| status.to_string());
            return Err(GeocodeError::Unavailable(detail));
        }
    }

    let result = match response.results.as_slice() {
        [] => return Ok(GeocodeLookup::NotFound),
        [only] => only,
        many => return Err(GeocodeError::AmbiguousResult(many.len())),
    };

    if let Some(location_type) = &result.geometry.location_type {
        if location_type != PRECISE_LOCATION_TYPE {
            return Err(GeocodeError::Approximate {
                location_type: location_type.clone(),
            });
        }
    }

    Ok(GeocodeLookup::Found(result.flatten()))
}
