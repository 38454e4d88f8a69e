//! Address field adapter
//!
//! The single entry point for assigning an address. Accepts an existing
//! address id, a component map or a bare string, and returns the stored
//! address with its hierarchy:
//!
//! 1. parse and normalize the input
//! 2. geocode and disambiguate when a subpremise is given (or geocode the raw
//!    string when that is all there is)
//! 3. get-or-create the hierarchy and create the address
//!
//! Geocoder trouble never fails an assignment; the address is stored raw-only.

use address_types::{AddressComponents, AddressId, AddressInput};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::ResolverConfig;
use crate::database::AddressStore;
use crate::disambiguation::substitute::find_subpremise;
use crate::disambiguation::Disambiguator;
use crate::error::AddressResult;
use crate::geocode::{lookup_before, GeocodeGateway, GeocodeResult};
use crate::parser::normalize::{comparison_key, subpremise_key};
use crate::parser::{
    input_from_json, parse_input, settle_geocoded, ParsedInput, ParsedRecord, RecordShape,
};
use crate::resolved::ResolvedAddress;
use crate::resolver::EntityResolver;

struct Geocoding {
    gateway: Arc<dyn GeocodeGateway>,
    disambiguator: Disambiguator,
    timeout: Duration,
    min_raw_tokens: usize,
}

pub struct AddressField {
    resolver: EntityResolver,
    geocoding: Option<Geocoding>,
}

impl AddressField {
    /// Geocoding is used only when a gateway is given and enabled in `config`
    pub fn new(
        store: Arc<dyn AddressStore>,
        gateway: Option<Arc<dyn GeocodeGateway>>,
        config: &ResolverConfig,
    ) -> Self {
        let geocoding = gateway
            .filter(|_| config.geocode.enabled)
            .map(|gateway| Geocoding {
                disambiguator: Disambiguator::new(
                    gateway.clone(),
                    config.subpremise,
                    config.geocode.timeout,
                ),
                gateway,
                timeout: config.geocode.timeout,
                min_raw_tokens: config.geocode.min_raw_tokens,
            });
        Self {
            resolver: EntityResolver::new(store, &config.resolver),
            geocoding,
        }
    }

    pub fn geocoding_enabled(&self) -> bool {
        self.geocoding.is_some()
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    /// Resolve and store `input`
    #[instrument(skip_all)]
    pub async fn assign(&self, input: impl Into<AddressInput>) -> AddressResult<ResolvedAddress> {
        match parse_input(input.into())? {
            ParsedInput::Existing(id) => self.load(id).await,
            ParsedInput::Record(record) => self.assign_record(record).await,
        }
    }

    /// Assign a dynamic value: a string, a component object or nothing else
    pub async fn assign_json(&self, value: serde_json::Value) -> AddressResult<ResolvedAddress> {
        self.assign(input_from_json(value)?).await
    }

    pub async fn load(&self, id: AddressId) -> AddressResult<ResolvedAddress> {
        ResolvedAddress::load(self.resolver.store().as_ref(), id).await
    }

    async fn assign_record(&self, record: ParsedRecord) -> AddressResult<ResolvedAddress> {
        let ParsedRecord { components, shape } = record;
        match (shape, &self.geocoding) {
            (RecordShape::Inconsistent, _) => {
                warn!(raw = %components.raw, "Incomplete locality hierarchy, storing raw address only");
                self.resolver.create_raw_only(&components.raw).await
            }
            (_, Some(geocoding)) if components.subpremise.is_some() => {
                let result = geocoding.disambiguator.resolve(&components).await?;
                info!(outcome = ?result.outcome, "Subpremise disambiguated");
                match result.components {
                    Some(resolved) => self.store_geocoded(resolved).await,
                    None => self.resolver.create_raw_only(&components.raw).await,
                }
            }
            (RecordShape::RawOnly, Some(geocoding)) => {
                self.assign_raw(geocoding, &components.raw).await
            }
            (RecordShape::RawOnly, None) => self.resolver.create_raw_only(&components.raw).await,
            (RecordShape::Structured, _) => self.resolver.resolve(&components).await,
        }
    }

    /// Geocoded components are trusted only when their hierarchy is complete
    async fn store_geocoded(&self, components: AddressComponents) -> AddressResult<ResolvedAddress> {
        let settled = settle_geocoded(components);
        if settled.shape == RecordShape::Inconsistent {
            warn!(raw = %settled.components.raw, "Geocoder returned an incomplete hierarchy, storing raw address only");
            return self.resolver.create_raw_only(&settled.components.raw).await;
        }
        self.resolver.resolve(&settled.components).await
    }

    /// Geocode a raw string, holding the result to the unit written in it.
    ///
    /// A result whose unit appears in `raw` is taken as is. When `raw` names a
    /// unit the geocoder dropped or changed, the subpremise policies decide.
    async fn assign_raw(&self, geocoding: &Geocoding, raw: &str) -> AddressResult<ResolvedAddress> {
        let deadline = tokio::time::Instant::now() + geocoding.timeout;
        let Some(result) = self.geocode_raw(geocoding, raw, deadline).await else {
            return self.resolver.create_raw_only(raw).await;
        };

        if subpremise_in(raw, result.subpremise.as_deref()) {
            return self.store_geocoded(result.to_components(raw)).await;
        }

        match find_subpremise(raw) {
            Some(written) => {
                let mut requested = result.to_components(raw);
                requested.subpremise = Some(written);
                let resolution = geocoding
                    .disambiguator
                    .reconcile(&requested, result, deadline)
                    .await?;
                info!(outcome = ?resolution.outcome, "Raw address subpremise disambiguated");
                match resolution.components {
                    Some(resolved) => self.store_geocoded(resolved).await,
                    None => self.resolver.create_raw_only(raw).await,
                }
            }
            None if result.partial_match => {
                debug!(returned = %result.formatted_address, "Rejecting partial geocode match");
                self.resolver.create_raw_only(raw).await
            }
            None => self.store_geocoded(result.to_components(raw)).await,
        }
    }

    /// One lookup of a raw string. Short strings are not sent: with too few
    /// tokens the backend guesses a region instead of failing.
    async fn geocode_raw(
        &self,
        geocoding: &Geocoding,
        raw: &str,
        deadline: tokio::time::Instant,
    ) -> Option<GeocodeResult> {
        let tokens = raw.split_whitespace().count();
        if tokens < geocoding.min_raw_tokens {
            debug!(tokens, "Raw address too short to geocode");
            return None;
        }

        let result = lookup_before(geocoding.gateway.as_ref(), raw, deadline).await?;
        if !result.has_coordinates() {
            debug!("Geocoded raw address has no coordinates");
            return None;
        }
        Some(result)
    }
}

/// Whether `subpremise` appears in `raw` as whole tokens
fn subpremise_in(raw: &str, subpremise: Option<&str>) -> bool {
    let Some(subpremise) = subpremise else {
        return false;
    };
    let wanted = subpremise_key(subpremise);
    if wanted.is_empty() {
        return false;
    }
    format!(" {} ", comparison_key(raw)).contains(&format!(" {} ", wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subpremise_in_raw() {
        assert!(subpremise_in("Unit 300, 10 Main St, Springfield", Some("300")));
        assert!(subpremise_in("10 Main St #300 Springfield", Some("#300")));
        assert!(!subpremise_in("10 Main St #3000 Springfield", Some("300")));
        assert!(subpremise_in("Apt 4-B, 10 Main St, Springfield", Some("4-B")));
        assert!(!subpremise_in("10 Main St Springfield", None));
    }
}
