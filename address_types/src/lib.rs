//! Address Types - Level 1 Foundation Types
//!
//! Pure data structures shared by the address resolution engine and its
//! storage backends:
//! - Entity identifiers and rows (country, state, locality, address)
//! - Natural uniqueness keys for the deduplicated hierarchy
//! - Insert payloads
//! - The normalized component record and the assignment input union
//!
//! ## Rules
//!
//! 1. **NO BUSINESS LOGIC** - normalization and resolution live in `address-resolver`
//! 2. **NO WORKSPACE DEPENDENCIES**
//! 3. **SERIALIZABLE** - all types support serde

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// IDENTIFIERS
// ============================================================================

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// Primary key of a country row
    CountryId
);
entity_id!(
    /// Primary key of a state row
    StateId
);
entity_id!(
    /// Primary key of a locality row
    LocalityId
);
entity_id!(
    /// Primary key of an address row
    AddressId
);

// ============================================================================
// ENTITIES
// ============================================================================

/// A country. Uniqueness key: `code` when present, else `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Country {
    pub id: CountryId,
    pub name: String,
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A first-level administrative region. Geocoders call this
/// `administrative_area_level_1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub id: StateId,
    pub name: String,
    pub code: Option<String>,
    pub country_id: CountryId,
    pub created_at: DateTime<Utc>,
}

/// A locality (city, suburb or borough)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locality {
    pub id: LocalityId,
    pub name: String,
    pub postal_code: Option<String>,
    pub state_id: StateId,
    pub created_at: DateTime<Utc>,
}

/// A street-level address.
///
/// `raw` is what the caller or autocomplete produced and is never rewritten.
/// Raw-only addresses have no structured fields and no locality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub raw: String,
    pub street_number: Option<String>,
    pub route: Option<String>,
    pub subpremise: Option<String>,
    pub locality_id: Option<LocalityId>,
    pub formatted: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// True when the address carries nothing but its raw string
    pub fn is_raw_only(&self) -> bool {
        self.street_number.is_none()
            && self.route.is_none()
            && self.subpremise.is_none()
            && self.locality_id.is_none()
    }
}

// ============================================================================
// NATURAL KEYS
// ============================================================================

/// Identifying value of a country or state: the code wins when one is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum NaturalKey {
    Code(String),
    Name(String),
}

impl NaturalKey {
    pub fn from_parts(name: &str, code: Option<&str>) -> Self {
        match code {
            Some(code) => NaturalKey::Code(code.to_string()),
            None => NaturalKey::Name(name.to_string()),
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NaturalKey::Code(code) => write!(f, "code={}", code),
            NaturalKey::Name(name) => write!(f, "name={}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountryKey(pub NaturalKey);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub country_id: CountryId,
    pub key: NaturalKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalityKey {
    pub state_id: StateId,
    pub name: String,
    pub postal_code: Option<String>,
}

/// The entity kinds of the deduplicated hierarchy plus the address leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Country,
    State,
    Locality,
    Address,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Country => "country",
            EntityKind::State => "state",
            EntityKind::Locality => "locality",
            EntityKind::Address => "address",
        };
        f.write_str(name)
    }
}

// ============================================================================
// INSERT PAYLOADS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCountry {
    pub name: String,
    pub code: Option<String>,
}

impl NewCountry {
    pub fn key(&self) -> CountryKey {
        CountryKey(NaturalKey::from_parts(&self.name, self.code.as_deref()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewState {
    pub name: String,
    pub code: Option<String>,
    pub country_id: CountryId,
}

impl NewState {
    pub fn key(&self) -> StateKey {
        StateKey {
            country_id: self.country_id,
            key: NaturalKey::from_parts(&self.name, self.code.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLocality {
    pub name: String,
    pub postal_code: Option<String>,
    pub state_id: StateId,
}

impl NewLocality {
    pub fn key(&self) -> LocalityKey {
        LocalityKey {
            state_id: self.state_id,
            name: self.name.clone(),
            postal_code: self.postal_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAddress {
    pub raw: String,
    pub street_number: Option<String>,
    pub route: Option<String>,
    pub subpremise: Option<String>,
    pub locality_id: Option<LocalityId>,
    pub formatted: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl NewAddress {
    /// An address that keeps only the caller's raw string
    pub fn raw_only(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            raw,
            formatted: String::new(),
            street_number: None,
            route: None,
            subpremise: None,
            locality_id: None,
            latitude: None,
            longitude: None,
        }
    }
}

// ============================================================================
// COMPONENT RECORDS AND INPUTS
// ============================================================================

/// Normalized address components: trimmed, blank values absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressComponents {
    pub raw: String,
    pub street_number: Option<String>,
    pub route: Option<String>,
    pub subpremise: Option<String>,
    pub locality: Option<String>,
    pub postal_code: Option<String>,
    pub state: Option<String>,
    pub state_code: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub formatted: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A latitude or longitude as submitted: forms post strings, APIs post numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    Number(f64),
    Text(String),
}

/// Address components as submitted by a caller, before normalization.
///
/// Unknown keys are ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentMap {
    pub raw: Option<String>,
    pub street_number: Option<String>,
    pub route: Option<String>,
    pub subpremise: Option<String>,
    pub locality: Option<String>,
    pub sublocality: Option<String>,
    pub postal_code: Option<String>,
    pub state: Option<String>,
    pub state_code: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub formatted: Option<String>,
    pub latitude: Option<CoordinateInput>,
    pub longitude: Option<CoordinateInput>,
}

/// The three accepted shapes of an address assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AddressInput {
    /// An address that already exists; passed through unchanged
    Existing(AddressId),
    /// A structured component bundle
    Components(ComponentMap),
    /// A bare string, treated as `raw`
    Raw(String),
}

impl From<AddressId> for AddressInput {
    fn from(id: AddressId) -> Self {
        AddressInput::Existing(id)
    }
}

impl From<ComponentMap> for AddressInput {
    fn from(map: ComponentMap) -> Self {
        AddressInput::Components(map)
    }
}

impl From<String> for AddressInput {
    fn from(raw: String) -> Self {
        AddressInput::Raw(raw)
    }
}

impl From<&str> for AddressInput {
    fn from(raw: &str) -> Self {
        AddressInput::Raw(raw.to_string())
    }
}
