//! Domain errors

use thiserror::Error;

/// Domain-level error types, mapped to HTTP statuses at the API boundary.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("No spots available in this lot")]
    LotFull,

    #[error("Only {available} spot(s) available, requested {requested}")]
    InsufficientSpots { requested: u32, available: u32 },

    #[error("Cannot reduce capacity below {occupied} occupied spot(s)")]
    CapacityBelowOccupied { occupied: u64 },

    #[error("The archive lot cannot be {0}")]
    ArchiveProtected(&'static str),

    #[error("Reservation {0} is not active")]
    ReservationNotActive(i32),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            field,
            value: value.into(),
        }
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
