//! Booking and release handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::domain_error;
use crate::api::dto::{ApiResponse, ReservationDto, ReserveRequest};
use crate::api::extract::ValidatedJson;
use crate::application::services::ReservationService;
use crate::auth::AuthenticatedUser;
use crate::infrastructure::{ResponseCache, Storage};

#[derive(Clone)]
pub struct ReservationState {
    pub storage: Arc<dyn Storage>,
    pub reservation_service: Arc<ReservationService>,
    pub cache: Arc<ResponseCache>,
}

impl ReservationState {
    /// Builds display DTOs with lot and spot labels resolved.
    async fn to_dtos(
        &self,
        reservations: &[crate::domain::Reservation],
    ) -> Result<Vec<ReservationDto>, crate::domain::DomainError> {
        let spots = self.storage.list_all_spots().await?;
        let lots = self.storage.list_lots().await?;
        Ok(reservations
            .iter()
            .map(|r| ReservationDto::from_reservation(r, &spots, &lots))
            .collect())
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    request_body = ReserveRequest,
    responses(
        (status = 201, description = "Spots reserved", body = ApiResponse<Vec<ReservationDto>>),
        (status = 409, description = "Lot full or not enough free spots"),
        (status = 404, description = "Lot not found"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_reservations(
    State(state): State<ReservationState>,
    user: Option<axum::Extension<AuthenticatedUser>>,
    ValidatedJson(request): ValidatedJson<ReserveRequest>,
) -> Result<
    (StatusCode, Json<ApiResponse<Vec<ReservationDto>>>),
    (StatusCode, Json<ApiResponse<Vec<ReservationDto>>>),
> {
    let Some(user) = user else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Not authenticated")),
        ));
    };

    let reservations = state
        .reservation_service
        .reserve(request.lot_id, &user.user_id, request.quantity)
        .await
        .map_err(domain_error)?;

    state.cache.invalidate_all();

    let dtos = state.to_dtos(&reservations).await.map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(dtos))))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/release",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation billed and closed", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Reservation already closed"),
        (status = 403, description = "Reservation belongs to another user"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn release_reservation(
    State(state): State<ReservationState>,
    user: Option<axum::Extension<AuthenticatedUser>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ReservationDto>>, (StatusCode, Json<ApiResponse<ReservationDto>>)> {
    let Some(user) = user else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Not authenticated")),
        ));
    };

    let reservation = state
        .reservation_service
        .release(id, &user.user_id, user.is_admin())
        .await
        .map_err(domain_error)?;

    state.cache.invalidate_all();

    let dtos = state
        .to_dtos(std::slice::from_ref(&reservation))
        .await
        .map_err(domain_error)?;
    let Some(dto) = dtos.into_iter().next() else {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Internal server error")),
        ));
    };
    Ok(Json(ApiResponse::success(dto)))
}

#[utoipa::path(
    post,
    path = "/api/v1/spots/{id}/release",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Spot ID")),
    responses(
        (status = 200, description = "Active reservation on the spot billed and closed", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Spot not found or no active reservation on it"),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn release_spot(
    State(state): State<ReservationState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ReservationDto>>, (StatusCode, Json<ApiResponse<ReservationDto>>)> {
    let reservation = state
        .reservation_service
        .force_release_spot(id)
        .await
        .map_err(domain_error)?;

    state.cache.invalidate_all();

    let dtos = state
        .to_dtos(std::slice::from_ref(&reservation))
        .await
        .map_err(domain_error)?;
    let Some(dto) = dtos.into_iter().next() else {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error("Internal server error")),
        ));
    };
    Ok(Json(ApiResponse::success(dto)))
}
