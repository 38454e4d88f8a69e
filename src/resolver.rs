//! Entity resolution
//!
//! Get-or-create of the address hierarchy, parent before child:
//! Country, then State within it, then Locality within that, then a fresh
//! Address. Uniqueness is enforced by the store. An insert that loses a race
//! is followed by a refetch of the winner's row; only when that keeps failing
//! past `max_conflict_attempts` does resolution give up.

use address_types::{
    AddressComponents, Country, EntityKind, Locality, NewAddress, NewCountry, NewLocality,
    NewState, State,
};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::config::EntityResolverConfig;
use crate::database::{AddressStore, StoreError, StoreResult};
use crate::error::{AddressError, AddressResult};
use crate::parser::compose_address;
use crate::resolved::{Hierarchy, ResolvedAddress};

pub struct EntityResolver {
    store: Arc<dyn AddressStore>,
    max_attempts: u32,
}

impl EntityResolver {
    pub fn new(store: Arc<dyn AddressStore>, config: &EntityResolverConfig) -> Self {
        Self {
            store,
            max_attempts: config.max_conflict_attempts.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn AddressStore> {
        &self.store
    }

    pub async fn resolve_country(&self, name: &str, code: Option<&str>) -> AddressResult<Country> {
        let new = NewCountry {
            name: name.to_string(),
            code: code.map(str::to_string),
        };
        let key = new.key();
        get_or_create(
            EntityKind::Country,
            &key.0.to_string(),
            self.max_attempts,
            || self.store.find_country(&key),
            || self.store.insert_country(&new),
        )
        .await
    }

    pub async fn resolve_state(
        &self,
        name: &str,
        code: Option<&str>,
        country: &Country,
    ) -> AddressResult<State> {
        let new = NewState {
            name: name.to_string(),
            code: code.map(str::to_string),
            country_id: country.id,
        };
        let key = new.key();
        get_or_create(
            EntityKind::State,
            &format!("{} in {}", key.key, country.id),
            self.max_attempts,
            || self.store.find_state(&key),
            || self.store.insert_state(&new),
        )
        .await
    }

    pub async fn resolve_locality(
        &self,
        name: &str,
        postal_code: Option<&str>,
        state: &State,
    ) -> AddressResult<Locality> {
        let new = NewLocality {
            name: name.to_string(),
            postal_code: postal_code.map(str::to_string),
            state_id: state.id,
        };
        let key = new.key();
        get_or_create(
            EntityKind::Locality,
            &format!(
                "{} {} in {}",
                key.name,
                key.postal_code.as_deref().unwrap_or("-"),
                state.id
            ),
            self.max_attempts,
            || self.store.find_locality(&key),
            || self.store.insert_locality(&new),
        )
        .await
    }

    /// Resolve the hierarchy of `components`; `None` when it names none.
    ///
    /// Country, state and locality must be all present or all absent.
    pub async fn resolve_hierarchy(
        &self,
        components: &AddressComponents,
    ) -> AddressResult<Option<Hierarchy>> {
        let (country, state, locality) = match (
            components.country.as_deref(),
            components.state.as_deref(),
            components.locality.as_deref(),
        ) {
            (Some(country), Some(state), Some(locality)) => (country, state, locality),
            (None, None, None) => return Ok(None),
            _ => {
                return Err(AddressError::invalid(
                    "country, state and locality must be given together",
                ))
            }
        };

        let country = self
            .resolve_country(country, components.country_code.as_deref())
            .await?;
        let state = self
            .resolve_state(state, components.state_code.as_deref(), &country)
            .await?;
        let locality = self
            .resolve_locality(locality, components.postal_code.as_deref(), &state)
            .await?;
        Ok(Some(Hierarchy {
            country,
            state,
            locality,
        }))
    }

    /// Resolve the hierarchy and create a new address linked to it
    #[instrument(skip(self, components), fields(raw = %components.raw))]
    pub async fn resolve(&self, components: &AddressComponents) -> AddressResult<ResolvedAddress> {
        let hierarchy = self.resolve_hierarchy(components).await?;
        let new = NewAddress {
            raw: components.raw.clone(),
            street_number: components.street_number.clone(),
            route: components.route.clone(),
            subpremise: components.subpremise.clone(),
            locality_id: hierarchy.as_ref().map(|h| h.locality.id),
            formatted: components
                .formatted
                .clone()
                .unwrap_or_else(|| compose_address(components)),
            latitude: components.latitude,
            longitude: components.longitude,
        };
        let address = self.store.insert_address(&new).await?;
        debug!(address_id = %address.id, linked = hierarchy.is_some(), "Created address");
        Ok(ResolvedAddress::new(address, hierarchy))
    }

    /// Create an address that keeps only `raw`
    pub async fn create_raw_only(&self, raw: &str) -> AddressResult<ResolvedAddress> {
        let address = self.store.insert_address(&NewAddress::raw_only(raw)).await?;
        debug!(address_id = %address.id, "Created raw-only address");
        Ok(ResolvedAddress::new(address, None))
    }
}

/// Find by key, else insert. A uniqueness conflict means another writer won,
/// so the row is fetched again; inserts are attempted at most `max_attempts`
/// times.
async fn get_or_create<T, Find, FindFut, Insert, InsertFut>(
    kind: EntityKind,
    key: &str,
    max_attempts: u32,
    find: Find,
    insert: Insert,
) -> AddressResult<T>
where
    Find: Fn() -> FindFut,
    FindFut: Future<Output = StoreResult<Option<T>>>,
    Insert: Fn() -> InsertFut,
    InsertFut: Future<Output = StoreResult<T>>,
{
    let mut attempts = 0;
    loop {
        if let Some(existing) = find().await? {
            return Ok(existing);
        }
        if attempts == max_attempts {
            break;
        }
        attempts += 1;
        match insert().await {
            Ok(created) => {
                debug!(%kind, key, "Created");
                return Ok(created);
            }
            Err(StoreError::UniquenessConflict { .. }) => {
                debug!(%kind, key, attempt = attempts, "Lost insert race, refetching");
            }
            Err(e) => return Err(e.into()),
        }
    }

    warn!(%kind, key, attempts, "Could not settle concurrent inserts");
    Err(AddressError::PersistenceConflict {
        kind,
        key: key.to_string(),
        attempts,
    })
}
