//! Parking lot management handlers.
//!
//! Creation, update and deletion are admin operations. The available-lots
//! listing backs the booking screen and is served from the response cache
//! when fresh.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use super::domain_error;
use crate::api::dto::{
    ActiveReservationDto, ApiResponse, AvailableLotDto, CreateLotRequest, EmptyData, LotDto,
    SpotStatusDto, UpdateLotRequest,
};
use crate::api::extract::ValidatedJson;
use crate::application::services::{LotService, LotUpdate, NewLot};
use crate::domain::sort_for_display;
use crate::infrastructure::{CacheKey, ResponseCache, Storage};

#[derive(Clone)]
pub struct LotState {
    pub storage: Arc<dyn Storage>,
    pub lot_service: Arc<LotService>,
    pub cache: Arc<ResponseCache>,
}

#[utoipa::path(
    post,
    path = "/api/v1/lots",
    tag = "Lots",
    security(("bearer_auth" = [])),
    request_body = CreateLotRequest,
    responses(
        (status = 201, description = "Lot created with its spots", body = ApiResponse<LotDto>),
        (status = 409, description = "Lot name already in use"),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn create_lot(
    State(state): State<LotState>,
    ValidatedJson(request): ValidatedJson<CreateLotRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LotDto>>), (StatusCode, Json<ApiResponse<LotDto>>)> {
    let lot = state
        .lot_service
        .create_lot(NewLot {
            name: request.name,
            address: request.address,
            pin_code: request.pin_code,
            price_per_hour: request.price_per_hour,
            capacity: request.capacity as i32,
        })
        .await
        .map_err(domain_error)?;

    let spots = state
        .storage
        .list_spots_for_lot(lot.id)
        .await
        .map_err(domain_error)?;

    state.cache.invalidate_all();

    let dto = LotDto::from_lot(lot, &spots).with_spots(spots);
    Ok((StatusCode::CREATED, Json(ApiResponse::success(dto))))
}

#[utoipa::path(
    get,
    path = "/api/v1/lots",
    tag = "Lots",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All lots, archive last", body = ApiResponse<Vec<LotDto>>),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn list_lots(
    State(state): State<LotState>,
) -> Result<Json<ApiResponse<Vec<LotDto>>>, (StatusCode, Json<ApiResponse<Vec<LotDto>>>)> {
    let mut lots = state.storage.list_lots().await.map_err(domain_error)?;
    sort_for_display(&mut lots);

    let spots = state.storage.list_all_spots().await.map_err(domain_error)?;

    let dtos = lots
        .into_iter()
        .map(|lot| {
            let own: Vec<_> = spots.iter().filter(|s| s.lot_id == lot.id).cloned().collect();
            LotDto::from_lot(lot, &own).with_spots(own)
        })
        .collect();

    Ok(Json(ApiResponse::success(dtos)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lots/{id}",
    tag = "Lots",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lot ID")),
    responses(
        (status = 200, description = "Lot detail with spots", body = ApiResponse<LotDto>),
        (status = 404, description = "Lot not found")
    )
)]
pub async fn get_lot(
    State(state): State<LotState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<LotDto>>, (StatusCode, Json<ApiResponse<LotDto>>)> {
    let lot = state.storage.get_lot(id).await.map_err(domain_error)?;
    let Some(lot) = lot else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Lot {} not found", id))),
        ));
    };

    let spots = state
        .storage
        .list_spots_for_lot(lot.id)
        .await
        .map_err(domain_error)?;

    let dto = LotDto::from_lot(lot, &spots).with_spots(spots);
    Ok(Json(ApiResponse::success(dto)))
}

#[utoipa::path(
    put,
    path = "/api/v1/lots/{id}",
    tag = "Lots",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lot ID")),
    request_body = UpdateLotRequest,
    responses(
        (status = 200, description = "Lot updated", body = ApiResponse<LotDto>),
        (status = 404, description = "Lot not found"),
        (status = 409, description = "Capacity below occupied spots"),
        (status = 403, description = "Archive lot is read-only")
    )
)]
pub async fn update_lot(
    State(state): State<LotState>,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<UpdateLotRequest>,
) -> Result<Json<ApiResponse<LotDto>>, (StatusCode, Json<ApiResponse<LotDto>>)> {
    let lot = state
        .lot_service
        .update_lot(
            id,
            LotUpdate {
                name: request.name,
                address: request.address,
                pin_code: request.pin_code,
                price_per_hour: request.price_per_hour,
                capacity: request.capacity.map(|c| c as i32),
            },
        )
        .await
        .map_err(domain_error)?;

    let spots = state
        .storage
        .list_spots_for_lot(lot.id)
        .await
        .map_err(domain_error)?;

    state.cache.invalidate_all();

    let dto = LotDto::from_lot(lot, &spots).with_spots(spots);
    Ok(Json(ApiResponse::success(dto)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lots/{id}",
    tag = "Lots",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lot ID")),
    responses(
        (status = 200, description = "Lot deleted, history archived", body = ApiResponse<EmptyData>),
        (status = 404, description = "Lot not found"),
        (status = 400, description = "Lot has active reservations"),
        (status = 403, description = "Archive lot is read-only")
    )
)]
pub async fn delete_lot(
    State(state): State<LotState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EmptyData>>, (StatusCode, Json<ApiResponse<EmptyData>>)> {
    state.lot_service.delete_lot(id).await.map_err(domain_error)?;
    state.cache.invalidate_all();
    Ok(Json(ApiResponse::success(EmptyData {})))
}

#[utoipa::path(
    get,
    path = "/api/v1/lots/available",
    tag = "Lots",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Operational lots with free spot counts", body = ApiResponse<Vec<AvailableLotDto>>)
    )
)]
pub async fn available_lots(
    State(state): State<LotState>,
) -> Result<Json<ApiResponse<Value>>, (StatusCode, Json<ApiResponse<Value>>)> {
    if let Some(cached) = state.cache.get(CacheKey::AvailableLots) {
        return Ok(Json(ApiResponse::success(cached)));
    }

    let mut lots = state.storage.list_lots().await.map_err(domain_error)?;
    sort_for_display(&mut lots);
    let spots = state.storage.list_all_spots().await.map_err(domain_error)?;

    // Archive spots are always occupied, so the archive filters itself out.
    let dtos: Vec<AvailableLotDto> = lots
        .iter()
        .map(|lot| AvailableLotDto::from_lot(lot, &spots))
        .filter(|dto| dto.available_spots > 0)
        .collect();

    let payload = serde_json::to_value(&dtos).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        )
    })?;

    state.cache.put(CacheKey::AvailableLots, payload.clone());
    Ok(Json(ApiResponse::success(payload)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lots/{id}/spots",
    tag = "Lots",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lot ID")),
    responses(
        (status = 200, description = "Spot occupancy with reservation holders", body = ApiResponse<Vec<SpotStatusDto>>),
        (status = 404, description = "Lot not found")
    )
)]
pub async fn lot_spots(
    State(state): State<LotState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<SpotStatusDto>>>, (StatusCode, Json<ApiResponse<Vec<SpotStatusDto>>>)>
{
    let lot = state.storage.get_lot(id).await.map_err(domain_error)?;
    if lot.is_none() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Lot {} not found", id))),
        ));
    }

    let spots = state
        .storage
        .list_spots_for_lot(id)
        .await
        .map_err(domain_error)?;

    let mut statuses = Vec::with_capacity(spots.len());
    for spot in spots {
        let reservation = if spot.is_occupied {
            match state
                .storage
                .find_active_reservation_for_spot(spot.id)
                .await
                .map_err(domain_error)?
            {
                Some(r) => {
                    let email = state
                        .storage
                        .get_user(&r.user_id)
                        .await
                        .map_err(domain_error)?
                        .map(|u| u.email)
                        .unwrap_or_else(|| "-".into());
                    Some(ActiveReservationDto {
                        id: r.id,
                        user_id: r.user_id,
                        user_email: email,
                        start_time: r.start_time.to_rfc3339(),
                        total_cost: r.total_cost,
                    })
                }
                None => None,
            }
        } else {
            None
        };

        statuses.push(SpotStatusDto {
            id: spot.id,
            spot_number: spot.spot_number,
            is_occupied: spot.is_occupied,
            reservation,
        });
    }

    Ok(Json(ApiResponse::success(statuses)))
}
