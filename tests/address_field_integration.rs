//! Integration tests for address assignment
//!
//! Drives `AddressField` end to end over the in-memory store with a scripted
//! geocoder:
//! 1. Subpremise disambiguation policies and their gateway call counts
//! 2. Raw-only fallback when the geocoder has nothing (or fails)
//! 3. Hierarchy deduplication
//! 4. Input shapes and validation

mod helpers;

use std::time::Duration;

use address_resolver::geocode::ScriptedAnswer;
use address_resolver::{AddressError, AddressId, ComponentMap, SubpremisePolicy};
use helpers::{
    config, geocoded, harness, harness_with, melbourne, south_jordan, SOUTH_JORDAN_RAW,
};

fn policy(ignore_missing: bool, retry: bool, replace_only: bool) -> SubpremisePolicy {
    SubpremisePolicy {
        ignore_missing_subpremise: ignore_missing,
        subpremise_retry_with_replace: retry,
        subpremise_replace_only: replace_only,
    }
}

// ============================================================================
// Subpremise disambiguation
// ============================================================================

#[tokio::test]
async fn test_exact_subpremise_match_needs_one_lookup() {
    let h = harness(
        vec![ScriptedAnswer::Found(geocoded(Some("300")))],
        SubpremisePolicy::default(),
    );

    let resolved = h.field.assign(south_jordan("300")).await.unwrap();

    assert_eq!(resolved.subpremise(), Some("300"));
    assert_eq!(resolved.raw(), SOUTH_JORDAN_RAW);
    assert_eq!(resolved.locality().map(|l| l.name.as_str()), Some("South Jordan"));
    assert_eq!(resolved.address.latitude, Some(40.5539));
    assert_eq!(h.gateway.call_count().await, 1);
}

#[tokio::test]
async fn test_ignore_missing_keeps_requested_subpremise() {
    let h = harness(
        vec![ScriptedAnswer::Found(geocoded(None))],
        policy(true, false, false),
    );

    let resolved = h.field.assign(south_jordan("300")).await.unwrap();

    assert_eq!(resolved.subpremise(), Some("300"));
    assert_eq!(h.gateway.call_count().await, 1);
}

#[tokio::test]
async fn test_ignore_missing_does_not_cover_a_different_subpremise() {
    let h = harness(
        vec![ScriptedAnswer::Found(geocoded(Some("4")))],
        policy(true, false, false),
    );

    let err = h.field.assign(south_jordan("300")).await.unwrap_err();

    assert!(matches!(err, AddressError::SubpremiseAmbiguous { .. }));
    assert_eq!(h.store.counts().await.addresses, 0);
}

#[tokio::test]
async fn test_retry_with_replace_makes_exactly_two_lookups() {
    let h = harness(
        vec![
            ScriptedAnswer::Found(geocoded(Some("4"))),
            ScriptedAnswer::Found(geocoded(Some("300"))),
        ],
        policy(false, true, false),
    );

    let resolved = h.field.assign(south_jordan("300")).await.unwrap();

    assert_eq!(resolved.subpremise(), Some("300"));
    let queries = h.gateway.queries().await;
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[1], SOUTH_JORDAN_RAW);
}

#[tokio::test]
async fn test_replace_only_skips_the_retry() {
    let h = harness(
        vec![ScriptedAnswer::Found(geocoded(Some("4")))],
        policy(false, false, true),
    );

    let resolved = h.field.assign(south_jordan("300")).await.unwrap();

    assert_eq!(resolved.subpremise(), Some("300"));
    assert_eq!(resolved.address.formatted, SOUTH_JORDAN_RAW);
    assert_eq!(resolved.country().and_then(|c| c.code.as_deref()), Some("US"));
    assert_eq!(h.gateway.call_count().await, 1);
}

#[tokio::test]
async fn test_unresolved_ambiguity_reports_both_values() {
    let h = harness(
        vec![ScriptedAnswer::Found(geocoded(Some("4")))],
        SubpremisePolicy::default(),
    );

    let err = h.field.assign(south_jordan("300")).await.unwrap_err();

    match err {
        AddressError::SubpremiseAmbiguous {
            requested,
            returned,
        } => {
            assert_eq!(requested, "300");
            assert_eq!(returned.as_deref(), Some("4"));
        }
        other => panic!("expected SubpremiseAmbiguous, got {:?}", other),
    }
}

// ============================================================================
// Degraded paths
// ============================================================================

#[tokio::test]
async fn test_not_found_stores_raw_only() {
    let h = harness(vec![ScriptedAnswer::NotFound], policy(false, true, false));

    let resolved = h.field.assign(south_jordan("300")).await.unwrap();

    assert!(resolved.is_raw_only());
    assert_eq!(resolved.raw(), SOUTH_JORDAN_RAW);
    assert!(resolved.address.street_number.is_none());
    assert!(resolved.address.route.is_none());
    assert!(resolved.locality().is_none());
    let counts = h.store.counts().await;
    assert_eq!((counts.countries, counts.addresses), (0, 1));
}

#[tokio::test]
async fn test_gateway_failure_stores_raw_only() {
    let h = harness(
        vec![ScriptedAnswer::Fail("OVER_QUERY_LIMIT".to_string())],
        SubpremisePolicy::default(),
    );

    let resolved = h.field.assign(south_jordan("300")).await.unwrap();

    assert!(resolved.is_raw_only());
}

#[tokio::test]
async fn test_gateway_timeout_stores_raw_only() {
    let mut config = config(SubpremisePolicy::default());
    config.geocode.timeout = Duration::from_millis(50);
    let h = harness_with(vec![ScriptedAnswer::Hang], config);

    let resolved = h.field.assign(south_jordan("300")).await.unwrap();

    assert!(resolved.is_raw_only());
    assert_eq!(h.gateway.call_count().await, 1);
}

#[tokio::test]
async fn test_retry_timeout_stores_raw_only() {
    let mut config = config(policy(false, true, false));
    config.geocode.timeout = Duration::from_millis(50);
    let h = harness_with(
        vec![ScriptedAnswer::Found(geocoded(Some("4"))), ScriptedAnswer::Hang],
        config,
    );

    let resolved = h.field.assign(south_jordan("300")).await.unwrap();

    assert!(resolved.is_raw_only());
    assert!(resolved.address.formatted.is_empty());
    assert_eq!(resolved.to_string(), SOUTH_JORDAN_RAW);
    assert_eq!(h.gateway.call_count().await, 2);
}

#[tokio::test]
async fn test_incomplete_hierarchy_stores_raw_only() {
    let h = harness(vec![], SubpremisePolicy::default());
    let mut input = melbourne("1");
    input.state = None;
    input.raw = Some("1 Some Street, Melbourne".to_string());

    let resolved = h.field.assign(input).await.unwrap();

    assert!(resolved.is_raw_only());
    assert_eq!(resolved.raw(), "1 Some Street, Melbourne");
    assert_eq!(h.gateway.call_count().await, 0);
}

// ============================================================================
// Hierarchy deduplication
// ============================================================================

#[tokio::test]
async fn test_same_hierarchy_is_shared() {
    let h = harness(vec![], SubpremisePolicy::default());

    let first = h.field.assign(melbourne("1")).await.unwrap();
    let second = h.field.assign(melbourne("2")).await.unwrap();

    assert_ne!(first.id(), second.id());
    assert_eq!(first.address.locality_id, second.address.locality_id);
    assert_eq!(first.state().map(|s| s.id), second.state().map(|s| s.id));
    let counts = h.store.counts().await;
    assert_eq!(
        (counts.countries, counts.states, counts.localities, counts.addresses),
        (1, 1, 1, 2)
    );
    // Structured input without a subpremise is stored as given
    assert_eq!(h.gateway.call_count().await, 0);
}

#[tokio::test]
async fn test_same_state_name_in_different_countries() {
    let h = harness(vec![], SubpremisePolicy::default());
    let mut uk = melbourne("1");
    uk.country = Some("United Kingdom".to_string());
    uk.country_code = Some("UK".to_string());

    h.field.assign(melbourne("1")).await.unwrap();
    h.field.assign(uk).await.unwrap();

    let counts = h.store.counts().await;
    assert_eq!((counts.countries, counts.states, counts.localities), (2, 2, 2));
}

// ============================================================================
// Raw string geocoding
// ============================================================================

#[tokio::test]
async fn test_raw_string_is_geocoded() {
    let h = harness(
        vec![ScriptedAnswer::Found(geocoded(Some("300")))],
        SubpremisePolicy::default(),
    );

    let resolved = h.field.assign(SOUTH_JORDAN_RAW).await.unwrap();

    assert_eq!(resolved.raw(), SOUTH_JORDAN_RAW);
    assert_eq!(resolved.address.street_number.as_deref(), Some("10855"));
    assert_eq!(resolved.state().and_then(|s| s.code.as_deref()), Some("UT"));
    assert_eq!(h.gateway.queries().await, vec![SOUTH_JORDAN_RAW.to_string()]);
}

#[tokio::test]
async fn test_short_raw_string_is_not_geocoded() {
    let h = harness(
        vec![ScriptedAnswer::Found(geocoded(None))],
        SubpremisePolicy::default(),
    );

    let resolved = h.field.assign("South Jordan, UT").await.unwrap();

    assert!(resolved.is_raw_only());
    assert_eq!(h.gateway.call_count().await, 0);
}

#[tokio::test]
async fn test_partial_match_accepted_when_unit_is_in_raw() {
    let mut partial = geocoded(Some("300"));
    partial.partial_match = true;
    let h = harness(
        vec![ScriptedAnswer::Found(partial)],
        SubpremisePolicy::default(),
    );
    let resolved = h.field.assign(SOUTH_JORDAN_RAW).await.unwrap();
    assert_eq!(resolved.subpremise(), Some("300"));
}

#[tokio::test]
async fn test_partial_match_without_written_unit_stores_raw_only() {
    let raw = "10855 S River Front Pkwy, South Jordan, UT 84095, USA";
    let mut partial = geocoded(None);
    partial.partial_match = true;
    let h = harness(vec![ScriptedAnswer::Found(partial)], policy(true, false, true));

    let resolved = h.field.assign(raw).await.unwrap();

    assert!(resolved.is_raw_only());
    assert_eq!(resolved.raw(), raw);
}

#[tokio::test]
async fn test_raw_unit_replaces_a_different_geocoded_unit() {
    let h = harness(
        vec![ScriptedAnswer::Found(geocoded(Some("100")))],
        policy(false, false, true),
    );

    let resolved = h.field.assign(SOUTH_JORDAN_RAW).await.unwrap();

    assert_eq!(resolved.subpremise(), Some("300"));
    assert_eq!(resolved.address.formatted, SOUTH_JORDAN_RAW);
    assert_eq!(resolved.locality().map(|l| l.name.as_str()), Some("South Jordan"));
    assert_eq!(h.gateway.call_count().await, 1);
}

#[tokio::test]
async fn test_raw_unit_kept_when_partial_match_drops_it() {
    let mut partial = geocoded(None);
    partial.partial_match = true;
    let h = harness(vec![ScriptedAnswer::Found(partial)], policy(true, false, false));

    let resolved = h.field.assign(SOUTH_JORDAN_RAW).await.unwrap();

    assert!(!resolved.is_raw_only());
    assert_eq!(resolved.subpremise(), Some("300"));
    assert_eq!(resolved.address.street_number.as_deref(), Some("10855"));
    assert_eq!(h.gateway.call_count().await, 1);
}

#[tokio::test]
async fn test_raw_unit_retried_with_replaced_query() {
    let h = harness(
        vec![
            ScriptedAnswer::Found(geocoded(Some("4"))),
            ScriptedAnswer::Found(geocoded(Some("300"))),
        ],
        policy(false, true, false),
    );

    let resolved = h.field.assign(SOUTH_JORDAN_RAW).await.unwrap();

    assert_eq!(resolved.subpremise(), Some("300"));
    assert_eq!(
        h.gateway.queries().await,
        vec![SOUTH_JORDAN_RAW.to_string(), SOUTH_JORDAN_RAW.to_string()]
    );
}

#[tokio::test]
async fn test_raw_unit_retry_not_found_stores_raw_only() {
    let h = harness(
        vec![
            ScriptedAnswer::Found(geocoded(Some("4"))),
            ScriptedAnswer::NotFound,
        ],
        policy(false, true, false),
    );

    let resolved = h.field.assign(SOUTH_JORDAN_RAW).await.unwrap();

    assert!(resolved.is_raw_only());
    assert_eq!(h.gateway.call_count().await, 2);
}

#[tokio::test]
async fn test_raw_unit_disagreement_without_policy_is_ambiguous() {
    let h = harness(
        vec![ScriptedAnswer::Found(geocoded(Some("100")))],
        SubpremisePolicy::default(),
    );

    match h.field.assign(SOUTH_JORDAN_RAW).await {
        Err(AddressError::SubpremiseAmbiguous { requested, returned }) => {
            assert_eq!(requested, "300");
            assert_eq!(returned.as_deref(), Some("100"));
        }
        other => panic!("expected SubpremiseAmbiguous, got {:?}", other),
    }
    assert_eq!(h.store.counts().await.addresses, 0);
}

#[tokio::test]
async fn test_geocoding_disabled_stores_input_as_given() {
    let mut config = config(policy(false, true, false));
    config.geocode.enabled = false;
    let h = harness_with(vec![], config);

    let resolved = h.field.assign(south_jordan("300")).await.unwrap();

    assert!(!h.field.geocoding_enabled());
    assert_eq!(resolved.subpremise(), Some("300"));
    assert_eq!(resolved.locality().map(|l| l.name.as_str()), Some("South Jordan"));
    assert_eq!(h.gateway.call_count().await, 0);
}

// ============================================================================
// Input shapes
// ============================================================================

#[tokio::test]
async fn test_existing_id_is_passed_through() {
    let h = harness(vec![], SubpremisePolicy::default());
    let created = h.field.assign(melbourne("1")).await.unwrap();

    let again = h.field.assign(created.id()).await.unwrap();

    assert_eq!(again, created);
    assert_eq!(h.store.counts().await.addresses, 1);
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let h = harness(vec![], SubpremisePolicy::default());
    let id = AddressId::new();

    let err = h.field.assign(id).await.unwrap_err();

    assert!(matches!(err, AddressError::AddressNotFound(missing) if missing == id));
}

#[tokio::test]
async fn test_invalid_inputs_are_rejected() {
    let h = harness(vec![], SubpremisePolicy::default());

    for input in [serde_json::json!(42), serde_json::json!(null), serde_json::json!({})] {
        let err = h.field.assign_json(input).await.unwrap_err();
        assert!(matches!(err, AddressError::InvalidAddressInput { .. }));
    }
    let err = h.field.assign("   ").await.unwrap_err();
    assert!(matches!(err, AddressError::InvalidAddressInput { .. }));

    let mut bad_code = melbourne("1");
    bad_code.country_code = Some("AUS".to_string());
    let err = h.field.assign(bad_code).await.unwrap_err();
    assert!(matches!(err, AddressError::InvalidAddressInput { .. }));

    assert_eq!(h.store.counts().await.addresses, 0);
}

#[tokio::test]
async fn test_json_component_map() {
    let h = harness(vec![], SubpremisePolicy::default());

    let resolved = h
        .field
        .assign_json(serde_json::json!({
            "street_number": "1",
            "route": "Some Street",
            "sublocality": "Brooklyn",
            "state": "New York",
            "state_code": "NY",
            "country": "United States",
            "country_code": "US",
            "latitude": "40.6782",
            "longitude": -73.9442,
            "place_id": "ignored"
        }))
        .await
        .unwrap();

    assert_eq!(resolved.locality().map(|l| l.name.as_str()), Some("Brooklyn"));
    assert_eq!(resolved.address.latitude, Some(40.6782));
    assert_eq!(resolved.raw(), "1 Some Street, Brooklyn, New York, United States");
}

#[tokio::test]
async fn test_code_repeating_the_name_is_dropped() {
    let h = harness(vec![], SubpremisePolicy::default());
    let input = ComponentMap {
        country_code: Some("Australia".to_string()),
        ..melbourne("1")
    };

    let resolved = h.field.assign(input).await.unwrap();

    assert_eq!(resolved.country().map(|c| c.code.clone()), Some(None));
}

#[tokio::test]
async fn test_read_back_as_components() {
    let h = harness(vec![], SubpremisePolicy::default());
    let resolved = h.field.assign(melbourne("1")).await.unwrap();

    let loaded = h.field.load(resolved.id()).await.unwrap();
    let components = loaded.as_components();

    assert_eq!(components.locality.as_deref(), Some("Melbourne"));
    assert_eq!(components.state_code.as_deref(), Some("VIC"));
    assert_eq!(components.country_code.as_deref(), Some("AU"));
    assert_eq!(
        loaded.hierarchy.as_ref().map(|h| h.locality_label()),
        Some("Melbourne, Victoria 3000, Australia".to_string())
    );
    assert_eq!(
        loaded.to_string(),
        "1 Some Street, Melbourne, Victoria 3000, Australia"
    );
}
