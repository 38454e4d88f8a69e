//! Address storage
//!
//! The [`AddressStore`] trait is the persistence boundary of the resolver.
//! Implementations must enforce the natural-key uniqueness of countries,
//! states and localities themselves and report a lost race as
//! [`StoreError::UniquenessConflict`]; the resolver never locks.

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

use address_types::{
    Address, AddressId, Country, CountryId, CountryKey, EntityKind, Locality, LocalityId,
    LocalityKey, NewAddress, NewCountry, NewLocality, NewState, State, StateId, StateKey,
};
use async_trait::async_trait;

pub use memory::InMemoryAddressStore;
#[cfg(feature = "database")]
pub use postgres::PgAddressStore;

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another writer already inserted a row with the same natural key
    #[error("{kind} already exists under the same key")]
    UniquenessConflict { kind: EntityKind },

    #[error("{kind} {id} does not exist")]
    MissingParent { kind: EntityKind, id: uuid::Uuid },

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Find-by-key and insert operations over the address hierarchy
#[async_trait]
pub trait AddressStore: Send + Sync {
    async fn find_country(&self, key: &CountryKey) -> StoreResult<Option<Country>>;

    /// Fails with `UniquenessConflict` when `new.key()` is taken
    async fn insert_country(&self, new: &NewCountry) -> StoreResult<Country>;

    async fn find_state(&self, key: &StateKey) -> StoreResult<Option<State>>;

    async fn insert_state(&self, new: &NewState) -> StoreResult<State>;

    async fn find_locality(&self, key: &LocalityKey) -> StoreResult<Option<Locality>>;

    async fn insert_locality(&self, new: &NewLocality) -> StoreResult<Locality>;

    /// Addresses have no natural key; every insert creates a row
    async fn insert_address(&self, new: &NewAddress) -> StoreResult<Address>;

    async fn get_address(&self, id: AddressId) -> StoreResult<Option<Address>>;

    async fn get_locality(&self, id: LocalityId) -> StoreResult<Option<Locality>>;

    async fn get_state(&self, id: StateId) -> StoreResult<Option<State>>;

    async fn get_country(&self, id: CountryId) -> StoreResult<Option<Country>>;
}
