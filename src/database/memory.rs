//! In-memory address store
//!
//! Holds the hierarchy in hash maps with one unique index per natural key,
//! mirroring the constraints of the Postgres schema. Used by tests and by
//! callers that run without a database.

use address_types::{
    Address, AddressId, Country, CountryId, CountryKey, EntityKind, Locality, LocalityId,
    LocalityKey, NewAddress, NewCountry, NewLocality, NewState, State, StateId, StateKey,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{AddressStore, StoreError, StoreResult};

/// Row counts per entity kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub countries: usize,
    pub states: usize,
    pub localities: usize,
    pub addresses: usize,
}

#[derive(Default)]
struct Tables {
    countries: HashMap<CountryId, Country>,
    country_keys: HashMap<CountryKey, CountryId>,
    states: HashMap<StateId, State>,
    state_keys: HashMap<StateKey, StateId>,
    localities: HashMap<LocalityId, Locality>,
    locality_keys: HashMap<LocalityKey, LocalityId>,
    addresses: HashMap<AddressId, Address>,
}

#[derive(Default)]
pub struct InMemoryAddressStore {
    tables: RwLock<Tables>,
}

impl InMemoryAddressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn counts(&self) -> EntityCounts {
        let tables = self.tables.read().await;
        EntityCounts {
            countries: tables.countries.len(),
            states: tables.states.len(),
            localities: tables.localities.len(),
            addresses: tables.addresses.len(),
        }
    }

    pub async fn addresses(&self) -> Vec<Address> {
        self.tables.read().await.addresses.values().cloned().collect()
    }
}

#[async_trait]
impl AddressStore for InMemoryAddressStore {
    async fn find_country(&self, key: &CountryKey) -> StoreResult<Option<Country>> {
        let tables = self.tables.read().await;
        Ok(tables
            .country_keys
            .get(key)
            .and_then(|id| tables.countries.get(id))
            .cloned())
    }

    async fn insert_country(&self, new: &NewCountry) -> StoreResult<Country> {
        let mut tables = self.tables.write().await;
        let key = new.key();
        if tables.country_keys.contains_key(&key) {
            return Err(StoreError::UniquenessConflict {
                kind: EntityKind::Country,
            });
        }
        let country = Country {
            id: CountryId::new(),
            name: new.name.clone(),
            code: new.code.clone(),
            created_at: Utc::now(),
        };
        tables.country_keys.insert(key, country.id);
        tables.countries.insert(country.id, country.clone());
        Ok(country)
    }

    async fn find_state(&self, key: &StateKey) -> StoreResult<Option<State>> {
        let tables = self.tables.read().await;
        Ok(tables
            .state_keys
            .get(key)
            .and_then(|id| tables.states.get(id))
            .cloned())
    }

    async fn insert_state(&self, new: &NewState) -> StoreResult<State> {
        let mut tables = self.tables.write().await;
        if !tables.countries.contains_key(&new.country_id) {
            return Err(StoreError::MissingParent {
                kind: EntityKind::Country,
                id: new.country_id.as_uuid(),
            });
        }
        let key = new.key();
        if tables.state_keys.contains_key(&key) {
            return Err(StoreError::UniquenessConflict {
                kind: EntityKind::State,
            });
        }
        let state = State {
            id: StateId::new(),
            name: new.name.clone(),
            code: new.code.clone(),
            country_id: new.country_id,
            created_at: Utc::now(),
        };
        tables.state_keys.insert(key, state.id);
        tables.states.insert(state.id, state.clone());
        Ok(state)
    }

    async fn find_locality(&self, key: &LocalityKey) -> StoreResult<Option<Locality>> {
        let tables = self.tables.read().await;
        Ok(tables
            .locality_keys
            .get(key)
            .and_then(|id| tables.localities.get(id))
            .cloned())
    }

    async fn insert_locality(&self, new: &NewLocality) -> StoreResult<Locality> {
        let mut tables = self.tables.write().await;
        if !tables.states.contains_key(&new.state_id) {
            return Err(StoreError::MissingParent {
                kind: EntityKind::State,
                id: new.state_id.as_uuid(),
            });
        }
        let key = new.key();
        if tables.locality_keys.contains_key(&key) {
            return Err(StoreError::UniquenessConflict {
                kind: EntityKind::Locality,
            });
        }
        let locality = Locality {
            id: LocalityId::new(),
            name: new.name.clone(),
            postal_code: new.postal_code.clone(),
            state_id: new.state_id,
            created_at: Utc::now(),
        };
        tables.locality_keys.insert(key, locality.id);
        tables.localities.insert(locality.id, locality.clone());
        Ok(locality)
    }

    async fn insert_address(&self, new: &NewAddress) -> StoreResult<Address> {
        let mut tables = self.tables.write().await;
        if let Some(locality_id) = new.locality_id {
            if !tables.localities.contains_key(&locality_id) {
                return Err(StoreError::MissingParent {
                    kind: EntityKind::Locality,
                    id: locality_id.as_uuid(),
                });
            }
        }
        let address = Address {
            id: AddressId::new(),
            raw: new.raw.clone(),
            street_number: new.street_number.clone(),
            route: new.route.clone(),
            subpremise: new.subpremise.clone(),
            locality_id: new.locality_id,
            formatted: new.formatted.clone(),
            latitude: new.latitude,
            longitude: new.longitude,
            created_at: Utc::now(),
        };
        tables.addresses.insert(address.id, address.clone());
        Ok(address)
    }

    async fn get_address(&self, id: AddressId) -> StoreResult<Option<Address>> {
        Ok(self.tables.read().await.addresses.get(&id).cloned())
    }

    async fn get_locality(&self, id: LocalityId) -> StoreResult<Option<Locality>> {
        Ok(self.tables.read().await.localities.get(&id).cloned())
    }

    async fn get_state(&self, id: StateId) -> StoreResult<Option<State>> {
        Ok(self.tables.read().await.states.get(&id).cloned())
    }

    async fn get_country(&self, id: CountryId) -> StoreResult<Option<Country>> {
        Ok(self.tables.read().await.countries.get(&id).cloned())
    }
}
