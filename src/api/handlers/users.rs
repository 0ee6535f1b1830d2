//! Admin user management handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::domain_error;
use crate::api::dto::{ApiResponse, ReservationDto, UserDetailDto, UserDto};
use crate::infrastructure::Storage;

#[derive(Clone)]
pub struct UserState {
    pub storage: Arc<dyn Storage>,
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All accounts sorted by email", body = ApiResponse<Vec<UserDto>>),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn list_users(
    State(state): State<UserState>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, (StatusCode, Json<ApiResponse<Vec<UserDto>>>)> {
    let users = state.storage.list_users().await.map_err(domain_error)?;
    let dtos = users.into_iter().map(UserDto::from).collect();
    Ok(Json(ApiResponse::success(dtos)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account detail with reservation history", body = ApiResponse<UserDetailDto>),
        (status = 404, description = "User not found"),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn get_user(
    State(state): State<UserState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserDetailDto>>, (StatusCode, Json<ApiResponse<UserDetailDto>>)> {
    let user = state.storage.get_user(&id).await.map_err(domain_error)?;
    let Some(user) = user else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("User {} not found", id))),
        ));
    };

    let reservations = state
        .storage
        .list_reservations_for_user(&user.id)
        .await
        .map_err(domain_error)?;
    let spots = state.storage.list_all_spots().await.map_err(domain_error)?;
    let lots = state.storage.list_lots().await.map_err(domain_error)?;

    let detail = UserDetailDto {
        user: user.into(),
        reservations: reservations
            .iter()
            .map(|r| ReservationDto::from_reservation(r, &spots, &lots))
            .collect(),
    };

    Ok(Json(ApiResponse::success(detail)))
}
