//! Error handling for address resolution
//!
//! Input and storage failures are surfaced to the caller. Geocoder failures
//! never reach this type: they are absorbed into the raw-only fallback.

use thiserror::Error;

use crate::database::StoreError;

/// Result type for address resolution operations
pub type AddressResult<T> = Result<T, AddressError>;

/// Main error type for the address resolution engine
#[derive(Error, Debug)]
pub enum AddressError {
    #[error("Invalid address input: {reason}")]
    InvalidAddressInput { reason: String },

    #[error("Subpremise '{requested}' does not match geocoded subpremise '{}'", returned.as_deref().unwrap_or(""))]
    SubpremiseAmbiguous {
        requested: String,
        returned: Option<String>,
    },

    #[error("Persistence conflict on {kind} {key} after {attempts} attempts")]
    PersistenceConflict {
        kind: address_types::EntityKind,
        key: String,
        attempts: u32,
    },

    #[error("Address not found: {0}")]
    AddressNotFound(address_types::AddressId),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl AddressError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        AddressError::InvalidAddressInput {
            reason: reason.into(),
        }
    }

    /// Whether retrying the whole assignment may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, AddressError::PersistenceConflict { .. })
    }
}
