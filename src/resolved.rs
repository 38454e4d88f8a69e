//! Read-back view of a stored address and its hierarchy

use address_types::{Address, AddressComponents, AddressId, Country, EntityKind, Locality, State};
use serde::Serialize;
use std::fmt;

use crate::database::{AddressStore, StoreError};
use crate::error::{AddressError, AddressResult};
use crate::parser::normalize::{join_lines, locality_line, street_line};

/// Country, state and locality an address is linked to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hierarchy {
    pub country: Country,
    pub state: State,
    pub locality: Locality,
}

impl Hierarchy {
    pub fn country_label(&self) -> String {
        country_label(&self.country)
    }

    /// "Victoria, Australia"
    pub fn state_label(&self) -> String {
        let state = if self.state.name.is_empty() {
            self.state.code.clone().unwrap_or_default()
        } else {
            self.state.name.clone()
        };
        format!("{}, {}", state, self.country_label())
    }

    /// "Melbourne, Victoria 3000, Australia"
    pub fn locality_label(&self) -> String {
        let state = if self.state.name.is_empty() {
            self.state.code.as_deref()
        } else {
            Some(self.state.name.as_str())
        };
        let country = self.country_label();
        locality_line(
            Some(&self.locality.name),
            state,
            self.locality.postal_code.as_deref(),
            Some(&country),
        )
    }
}

fn country_label(country: &Country) -> String {
    if country.name.is_empty() {
        country.code.clone().unwrap_or_default()
    } else {
        country.name.clone()
    }
}

/// A persisted address with its hierarchy loaded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAddress {
    pub address: Address,
    pub hierarchy: Option<Hierarchy>,
}

impl ResolvedAddress {
    pub fn new(address: Address, hierarchy: Option<Hierarchy>) -> Self {
        Self { address, hierarchy }
    }

    pub fn id(&self) -> AddressId {
        self.address.id
    }

    pub fn raw(&self) -> &str {
        &self.address.raw
    }

    pub fn subpremise(&self) -> Option<&str> {
        self.address.subpremise.as_deref()
    }

    pub fn locality(&self) -> Option<&Locality> {
        self.hierarchy.as_ref().map(|h| &h.locality)
    }

    pub fn state(&self) -> Option<&State> {
        self.hierarchy.as_ref().map(|h| &h.state)
    }

    pub fn country(&self) -> Option<&Country> {
        self.hierarchy.as_ref().map(|h| &h.country)
    }

    pub fn is_raw_only(&self) -> bool {
        self.address.is_raw_only()
    }

    /// Flatten back into the component key set accepted as input
    pub fn as_components(&self) -> AddressComponents {
        let a = &self.address;
        let mut components = AddressComponents {
            raw: a.raw.clone(),
            street_number: a.street_number.clone(),
            route: a.route.clone(),
            subpremise: a.subpremise.clone(),
            formatted: Some(a.formatted.clone()).filter(|f| !f.is_empty()),
            latitude: a.latitude,
            longitude: a.longitude,
            ..Default::default()
        };
        if let Some(h) = &self.hierarchy {
            components.locality = Some(h.locality.name.clone());
            components.postal_code = h.locality.postal_code.clone();
            components.state = Some(h.state.name.clone());
            components.state_code = h.state.code.clone();
            components.country = Some(h.country.name.clone());
            components.country_code = h.country.code.clone();
        }
        components
    }

    /// Load an address and walk its locality chain up to the country
    pub async fn load(store: &dyn AddressStore, id: AddressId) -> AddressResult<Self> {
        let address = store
            .get_address(id)
            .await?
            .ok_or(AddressError::AddressNotFound(id))?;
        let hierarchy = match address.locality_id {
            Some(locality_id) => {
                let locality = store.get_locality(locality_id).await?.ok_or(
                    StoreError::MissingParent {
                        kind: EntityKind::Locality,
                        id: locality_id.as_uuid(),
                    },
                )?;
                let state = store.get_state(locality.state_id).await?.ok_or(
                    StoreError::MissingParent {
                        kind: EntityKind::State,
                        id: locality.state_id.as_uuid(),
                    },
                )?;
                let country = store.get_country(state.country_id).await?.ok_or(
                    StoreError::MissingParent {
                        kind: EntityKind::Country,
                        id: state.country_id.as_uuid(),
                    },
                )?;
                Some(Hierarchy {
                    country,
                    state,
                    locality,
                })
            }
            None => None,
        };
        Ok(Self::new(address, hierarchy))
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = &self.address;
        if !a.formatted.is_empty() {
            return f.write_str(&a.formatted);
        }
        match &self.hierarchy {
            Some(h) => {
                let street = street_line(
                    a.street_number.as_deref(),
                    a.route.as_deref(),
                    a.subpremise.as_deref(),
                );
                f.write_str(&join_lines(&street, &h.locality_label()))
            }
            None => f.write_str(&a.raw),
        }
    }
}
