//! Address Resolver
//!
//! Turns address input (a bare string, a component map, or the id of an
//! existing address) into a stored address linked to a deduplicated
//! Country > State > Locality hierarchy.
//!
//! ## Pipeline
//!
//! ```text
//! AddressInput -> parser -> [geocode + disambiguation] -> resolver -> store
//! ```
//!
//! - [`parser`] normalizes input into [`AddressComponents`]
//! - [`disambiguation`] reconciles a caller's subpremise with the geocoder's
//! - [`resolver`] performs get-or-create of the hierarchy, refetching on
//!   uniqueness conflicts instead of locking
//! - [`field::AddressField`] ties the steps together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use address_resolver::{AddressField, InMemoryAddressStore, ResolverConfig};
//!
//! # async fn run() -> address_resolver::AddressResult<()> {
//! let field = AddressField::new(
//!     Arc::new(InMemoryAddressStore::new()),
//!     None,
//!     &ResolverConfig::default(),
//! );
//! let address = field.assign("1 Some Street, Melbourne VIC 3000").await?;
//! assert_eq!(address.raw(), "1 Some Street, Melbourne VIC 3000");
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

pub mod config;

// Storage backends
pub mod database;

// Input normalization
pub mod parser;

// Geocoding backends
pub mod geocode;

pub mod disambiguation;
pub mod field;
pub mod resolved;
pub mod resolver;

pub use address_types::{AddressComponents, AddressId, AddressInput, ComponentMap};
pub use config::{ResolverConfig, SubpremisePolicy};
pub use database::{AddressStore, InMemoryAddressStore, StoreError};
#[cfg(feature = "database")]
pub use database::PgAddressStore;
pub use disambiguation::{Disambiguation, Disambiguator, Outcome};
pub use error::{AddressError, AddressResult};
pub use field::AddressField;
pub use geocode::{GeocodeGateway, GeocodeResult, GoogleGeocoder};
pub use resolved::{Hierarchy, ResolvedAddress};
pub use resolver::EntityResolver;
