//! Shared fixtures for address resolution tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use address_resolver::database::{AddressStore, InMemoryAddressStore, StoreResult};
use address_resolver::geocode::{GeocodeGateway, ScriptedAnswer, ScriptedGateway};
use address_resolver::{AddressField, ComponentMap, GeocodeResult, ResolverConfig, SubpremisePolicy};
use address_types::{
    Address, AddressId, Country, CountryId, CountryKey, EntityKind, Locality, LocalityId,
    LocalityKey, NewAddress, NewCountry, NewLocality, NewState, State, StateId, StateKey,
};
use async_trait::async_trait;

pub const SOUTH_JORDAN_RAW: &str = "10855 S River Front Pkwy #300, South Jordan, UT 84095, USA";

/// Fully structured Melbourne address
pub fn melbourne(street_number: &str) -> ComponentMap {
    ComponentMap {
        street_number: Some(street_number.to_string()),
        route: Some("Some Street".to_string()),
        locality: Some("Melbourne".to_string()),
        postal_code: Some("3000".to_string()),
        state: Some("Victoria".to_string()),
        state_code: Some("VIC".to_string()),
        country: Some("Australia".to_string()),
        country_code: Some("AU".to_string()),
        ..Default::default()
    }
}

/// South Jordan office address as a caller would submit it
pub fn south_jordan(subpremise: &str) -> ComponentMap {
    ComponentMap {
        raw: Some(SOUTH_JORDAN_RAW.to_string()),
        street_number: Some("10855".to_string()),
        route: Some("S River Front Pkwy".to_string()),
        subpremise: Some(subpremise.to_string()),
        locality: Some("South Jordan".to_string()),
        postal_code: Some("84095".to_string()),
        state: Some("Utah".to_string()),
        state_code: Some("UT".to_string()),
        country: Some("United States".to_string()),
        country_code: Some("US".to_string()),
        ..Default::default()
    }
}

/// Rooftop result for the South Jordan address
pub fn geocoded(subpremise: Option<&str>) -> GeocodeResult {
    let unit = subpremise.map(|s| format!(" #{}", s)).unwrap_or_default();
    GeocodeResult {
        formatted_address: format!(
            "10855 S River Front Pkwy{}, South Jordan, UT 84095, USA",
            unit
        ),
        street_number: Some("10855".to_string()),
        route: Some("S River Front Pkwy".to_string()),
        subpremise: subpremise.map(str::to_string),
        locality: Some("South Jordan".to_string()),
        postal_code: Some("84095".to_string()),
        state: Some("Utah".to_string()),
        state_code: Some("UT".to_string()),
        country: Some("United States".to_string()),
        country_code: Some("US".to_string()),
        latitude: Some(40.5539),
        longitude: Some(-111.9262),
        partial_match: false,
    }
}

pub fn config(policy: SubpremisePolicy) -> ResolverConfig {
    let mut config = ResolverConfig::default();
    config.subpremise = policy;
    config.geocode.enabled = true;
    config.geocode.timeout = Duration::from_secs(2);
    config
}

pub struct Harness {
    pub store: Arc<InMemoryAddressStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub field: AddressField,
}

/// Field over an in-memory store and a scripted geocoder
pub fn harness(answers: Vec<ScriptedAnswer>, policy: SubpremisePolicy) -> Harness {
    harness_with(answers, config(policy))
}

pub fn harness_with(answers: Vec<ScriptedAnswer>, config: ResolverConfig) -> Harness {
    let store = Arc::new(InMemoryAddressStore::new());
    let gateway = Arc::new(ScriptedGateway::new(answers));
    let field = AddressField::new(
        store.clone(),
        Some(gateway.clone() as Arc<dyn GeocodeGateway>),
        &config,
    );
    Harness {
        store,
        gateway,
        field,
    }
}

/// Store where a competing writer slips in a row with the same key just
/// before the first insert of each hierarchy kind.
#[derive(Default)]
pub struct RacingStore {
    pub inner: InMemoryAddressStore,
    raced: Mutex<HashSet<EntityKind>>,
    conflicts: AtomicUsize,
}

impl RacingStore {
    pub fn conflicts(&self) -> usize {
        self.conflicts.load(Ordering::SeqCst)
    }

    fn first_insert(&self, kind: EntityKind) -> bool {
        self.raced
            .lock()
            .map(|mut raced| raced.insert(kind))
            .unwrap_or(false)
    }

    fn note<T>(&self, result: StoreResult<T>) -> StoreResult<T> {
        if result.is_err() {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
        }
        result
    }
}

#[async_trait]
impl AddressStore for RacingStore {
    async fn find_country(&self, key: &CountryKey) -> StoreResult<Option<Country>> {
        self.inner.find_country(key).await
    }

    async fn insert_country(&self, new: &NewCountry) -> StoreResult<Country> {
        if self.first_insert(EntityKind::Country) {
            self.inner.insert_country(new).await?;
        }
        self.note(self.inner.insert_country(new).await)
    }

    async fn find_state(&self, key: &StateKey) -> StoreResult<Option<State>> {
        self.inner.find_state(key).await
    }

    async fn insert_state(&self, new: &NewState) -> StoreResult<State> {
        if self.first_insert(EntityKind::State) {
            self.inner.insert_state(new).await?;
        }
        self.note(self.inner.insert_state(new).await)
    }

    async fn find_locality(&self, key: &LocalityKey) -> StoreResult<Option<Locality>> {
        self.inner.find_locality(key).await
    }

    async fn insert_locality(&self, new: &NewLocality) -> StoreResult<Locality> {
        if self.first_insert(EntityKind::Locality) {
            self.inner.insert_locality(new).await?;
        }
        self.note(self.inner.insert_locality(new).await)
    }

    async fn insert_address(&self, new: &NewAddress) -> StoreResult<Address> {
        self.inner.insert_address(new).await
    }

    async fn get_address(&self, id: AddressId) -> StoreResult<Option<Address>> {
        self.inner.get_address(id).await
    }

    async fn get_locality(&self, id: LocalityId) -> StoreResult<Option<Locality>> {
        self.inner.get_locality(id).await
    }

    async fn get_state(&self, id: StateId) -> StoreResult<Option<State>> {
        self.inner.get_state(id).await
    }

    async fn get_country(&self, id: CountryId) -> StoreResult<Option<Country>> {
        self.inner.get_country(id).await
    }
}
