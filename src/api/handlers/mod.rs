//! HTTP request handlers.

pub mod analytics;
pub mod auth;
pub mod exports;
pub mod health;
pub mod lots;
pub mod reservations;
pub mod users;

use axum::http::StatusCode;
use axum::Json;

use crate::api::dto::ApiResponse;
use crate::domain::DomainError;

/// Maps a domain error to its HTTP status and response envelope.
/// Storage failures are logged server-side and returned as an opaque 500.
pub(crate) fn domain_error<T>(err: DomainError) -> (StatusCode, Json<ApiResponse<T>>) {
    let status = match &err {
        DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
        DomainError::Validation(_) | DomainError::ReservationNotActive(_) => {
            StatusCode::BAD_REQUEST
        }
        DomainError::Conflict(_)
        | DomainError::LotFull
        | DomainError::InsufficientSpots { .. }
        | DomainError::CapacityBelowOccupied { .. } => StatusCode::CONFLICT,
        DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DomainError::Forbidden(_) | DomainError::ArchiveProtected(_) => StatusCode::FORBIDDEN,
        DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "internal error while handling request");
        "Internal server error".to_string()
    } else {
        err.to_string()
    };

    (status, Json(ApiResponse::error(message)))
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_error_classes() {
        let (status, _) = domain_error::<()>(DomainError::not_found("lot", "id", "7"));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = domain_error::<()>(DomainError::LotFull);
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = domain_error::<()>(DomainError::ArchiveProtected("deleted"));
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = domain_error::<()>(DomainError::ReservationNotActive(3));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_errors_are_not_leaked() {
        let (status, body) = domain_error::<()>(DomainError::Storage("db gone".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.0.error.as_deref(), Some("Internal server error"));
    }
}
