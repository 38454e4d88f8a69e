//! Subpremise disambiguation
//!
//! Geocoders are inconsistent about unit numbers: depending on punctuation
//! they drop the subpremise, return a different one, or move it into the
//! formatted text. The [`Disambiguator`] reconciles the caller's subpremise
//! with what the geocoder returned.
//!
//! ```text
//! Initial ── lookup ──┬── no match / street mismatch ──────────► NotFound (raw-only)
//!                     ├── same subpremise ─────────────────────► Exact
//!                     └── subpremise missing or different
//!                           1. ignore_missing (missing only) ──► ResolvedByAssumption
//!                           2. retry_with_replace ── lookup ───► ResolvedByRetry
//!                           3. replace_only ───────────────────► ResolvedBySubstitution
//!                           4. otherwise ──────────────────────► SubpremiseAmbiguous
//! ```
//!
//! A geocoded raw string enters at the policies through
//! [`Disambiguator::reconcile`], with the unit written in the string as the
//! requested one.

pub mod substitute;

use address_types::AddressComponents;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::config::SubpremisePolicy;
use crate::error::{AddressError, AddressResult};
use crate::geocode::{lookup_before, GeocodeGateway, GeocodeResult};
use crate::parser::geocode_query;
use crate::parser::normalize::{comparison_key, same_subpremise};
use substitute::substitute_subpremise;

/// Terminal state of a disambiguation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Exact,
    ResolvedByAssumption,
    ResolvedByRetry,
    ResolvedBySubstitution,
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Disambiguation {
    pub outcome: Outcome,
    /// Components to persist; `None` means store the address raw-only
    pub components: Option<AddressComponents>,
}

impl Disambiguation {
    fn resolved(outcome: Outcome, components: AddressComponents) -> Self {
        Self {
            outcome,
            components: Some(components),
        }
    }

    fn not_found() -> Self {
        Self {
            outcome: Outcome::NotFound,
            components: None,
        }
    }
}

pub struct Disambiguator {
    gateway: Arc<dyn GeocodeGateway>,
    policy: SubpremisePolicy,
    timeout: Duration,
}

impl Disambiguator {
    /// `timeout` covers both lookups of an assignment, not each one
    pub fn new(gateway: Arc<dyn GeocodeGateway>, policy: SubpremisePolicy, timeout: Duration) -> Self {
        Self {
            gateway,
            policy,
            timeout,
        }
    }

    pub fn policy(&self) -> SubpremisePolicy {
        self.policy
    }

    /// Geocode `requested` and reconcile its subpremise with the result.
    ///
    /// `requested` must carry a subpremise.
    #[instrument(skip(self, requested), fields(subpremise = requested.subpremise.as_deref()))]
    pub async fn resolve(&self, requested: &AddressComponents) -> AddressResult<Disambiguation> {
        let wanted = requested
            .subpremise
            .as_deref()
            .ok_or_else(|| AddressError::invalid("no subpremise to disambiguate"))?;
        let deadline = tokio::time::Instant::now() + self.timeout;

        let query = geocode_query(requested);
        let Some(result) = lookup_before(self.gateway.as_ref(), &query, deadline).await else {
            return Ok(Disambiguation::not_found());
        };

        if !street_matches(requested, &result) {
            debug!(
                query = %query,
                returned = %result.formatted_address,
                "Geocoded street does not match the requested one"
            );
            return Ok(Disambiguation::not_found());
        }

        if result
            .subpremise
            .as_deref()
            .is_some_and(|returned| same_subpremise(returned, wanted))
        {
            debug!("Geocoded subpremise matches");
            return Ok(Disambiguation::resolved(
                Outcome::Exact,
                with_subpremise(result.to_components(&requested.raw), wanted),
            ));
        }

        if !result.has_coordinates() {
            debug!("Geocoded result has no usable coordinates");
            return Ok(Disambiguation::not_found());
        }

        self.resolve_ambiguous(requested, wanted, result, deadline)
            .await
    }

    /// Reconcile a result already in hand with the subpremise in `requested`.
    ///
    /// For raw strings the first lookup is the string itself, so only the
    /// policies remain. `deadline` is the budget left from that lookup.
    #[instrument(skip(self, requested, result, deadline), fields(subpremise = requested.subpremise.as_deref()))]
    pub async fn reconcile(
        &self,
        requested: &AddressComponents,
        result: GeocodeResult,
        deadline: tokio::time::Instant,
    ) -> AddressResult<Disambiguation> {
        let wanted = requested
            .subpremise
            .as_deref()
            .ok_or_else(|| AddressError::invalid("no subpremise to disambiguate"))?;

        if result
            .subpremise
            .as_deref()
            .is_some_and(|returned| same_subpremise(returned, wanted))
        {
            return Ok(Disambiguation::resolved(
                Outcome::Exact,
                with_subpremise(result.to_components(&requested.raw), wanted),
            ));
        }

        self.resolve_ambiguous(requested, wanted, result, deadline)
            .await
    }

    async fn resolve_ambiguous(
        &self,
        requested: &AddressComponents,
        wanted: &str,
        result: GeocodeResult,
        deadline: tokio::time::Instant,
    ) -> AddressResult<Disambiguation> {
        let returned = result.subpremise.clone();
        info!(
            requested = wanted,
            returned = returned.as_deref().unwrap_or(""),
            "Subpremise disagreement"
        );

        if returned.is_none() && self.policy.ignore_missing_subpremise {
            return Ok(Disambiguation::resolved(
                Outcome::ResolvedByAssumption,
                substituted(requested, &result, wanted),
            ));
        }

        if self.policy.subpremise_retry_with_replace {
            let retry_query =
                substitute_subpremise(&result.formatted_address, returned.as_deref(), wanted);
            debug!(query = %retry_query, "Retrying with substituted subpremise");

            // One retry only: the backend can swallow the substitution again
            return match lookup_before(self.gateway.as_ref(), &retry_query, deadline).await {
                Some(retried) => Ok(Disambiguation::resolved(
                    Outcome::ResolvedByRetry,
                    retried.to_components(&requested.raw),
                )),
                None if self.policy.subpremise_replace_only => {
                    info!("Retry found nothing, keeping the first result with the requested subpremise");
                    Ok(Disambiguation::resolved(
                        Outcome::ResolvedBySubstitution,
                        substituted(requested, &result, wanted),
                    ))
                }
                None => {
                    info!("Retry found nothing, storing raw address only");
                    Ok(Disambiguation::not_found())
                }
            };
        }

        if self.policy.subpremise_replace_only {
            return Ok(Disambiguation::resolved(
                Outcome::ResolvedBySubstitution,
                substituted(requested, &result, wanted),
            ));
        }

        Err(AddressError::SubpremiseAmbiguous {
            requested: wanted.to_string(),
            returned,
        })
    }
}

/// Street number and route must agree wherever the caller supplied them
fn street_matches(requested: &AddressComponents, result: &GeocodeResult) -> bool {
    let agrees = |wanted: Option<&str>, got: Option<&str>| match (wanted, got) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(wanted), Some(got)) => comparison_key(wanted) == comparison_key(got),
    };
    agrees(requested.street_number.as_deref(), result.street_number.as_deref())
        && agrees(requested.route.as_deref(), result.route.as_deref())
}

fn with_subpremise(mut components: AddressComponents, subpremise: &str) -> AddressComponents {
    components.subpremise = Some(subpremise.to_string());
    components
}

/// The geocoded components with the caller's subpremise written over them
fn substituted(
    requested: &AddressComponents,
    result: &GeocodeResult,
    wanted: &str,
) -> AddressComponents {
    let mut components = with_subpremise(result.to_components(&requested.raw), wanted);
    if let Some(formatted) = components.formatted.as_mut() {
        *formatted = substitute_subpremise(formatted, result.subpremise.as_deref(), wanted);
    }
    components
}
