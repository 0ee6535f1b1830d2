//! Analytics handlers.
//!
//! The fleet-wide dashboard is cached under `admin_analytics`; the
//! per-user views are computed per request. Revenue is attributed to a
//! lot through the reserved spot, so archived history counts toward the
//! archive lot.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, Duration, Utc};
use serde_json::Value;

use super::domain_error;
use crate::api::dto::{
    AnalyticsSummary, ApiResponse, DailyRevenueDto, LotAnalytics, LotRef, LotSpend, LotSummary,
    OccupancySummary, RevenueSummary, UserLotAnalytics, UserSummary,
};
use crate::application::services::analytics;
use crate::auth::AuthenticatedUser;
use crate::domain::{sort_for_display, ParkingSpot, Reservation};
use crate::infrastructure::{CacheKey, ResponseCache, Storage};

const REVENUE_SERIES_DAYS: u32 = 30;

#[derive(Clone)]
pub struct AnalyticsState {
    pub storage: Arc<dyn Storage>,
    pub cache: Arc<ResponseCache>,
}

fn spot_to_lot(spots: &[ParkingSpot]) -> HashMap<i32, i32> {
    spots.iter().map(|s| (s.id, s.lot_id)).collect()
}

fn reservations_in_lot(
    reservations: &[Reservation],
    lot_id: i32,
    spot_lots: &HashMap<i32, i32>,
) -> Vec<Reservation> {
    reservations
        .iter()
        .filter(|r| spot_lots.get(&r.spot_id) == Some(&lot_id))
        .cloned()
        .collect()
}

fn occupancy_rate(occupied: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (occupied as f64 / total as f64 * 1000.0).round() / 10.0
}

fn to_series(daily: Vec<analytics::DailyRevenue>) -> Vec<DailyRevenueDto> {
    daily
        .into_iter()
        .map(|d| DailyRevenueDto {
            date: d.date.to_string(),
            revenue: d.revenue,
        })
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/v1/analytics",
    tag = "Analytics",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Fleet occupancy and revenue", body = ApiResponse<AnalyticsSummary>),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn admin_analytics(
    State(state): State<AnalyticsState>,
) -> Result<Json<ApiResponse<Value>>, (StatusCode, Json<ApiResponse<Value>>)> {
    if let Some(cached) = state.cache.get(CacheKey::AdminAnalytics) {
        return Ok(Json(ApiResponse::success(cached)));
    }

    let mut lots = state.storage.list_lots().await.map_err(domain_error)?;
    sort_for_display(&mut lots);
    let spots = state.storage.list_all_spots().await.map_err(domain_error)?;
    let reservations = state
        .storage
        .list_all_reservations()
        .await
        .map_err(domain_error)?;
    let spot_lots = spot_to_lot(&spots);

    // Occupancy ignores the archive; its spots are permanently occupied.
    let archive_ids: Vec<i32> = lots.iter().filter(|l| l.is_archive()).map(|l| l.id).collect();
    let operational: Vec<&ParkingSpot> = spots
        .iter()
        .filter(|s| !archive_ids.contains(&s.lot_id))
        .collect();
    let total_spots = operational.len() as u32;
    let occupied = operational.iter().filter(|s| s.is_occupied).count() as u32;

    let occupancy = OccupancySummary {
        total_spots,
        occupied,
        available: total_spots - occupied,
        occupancy_rate: occupancy_rate(occupied, total_spots),
    };

    let revenue = RevenueSummary {
        total_revenue: analytics::total_revenue(&reservations),
        total_reservations: reservations.len() as u64,
        active_reservations: reservations.iter().filter(|r| r.active).count() as u64,
    };

    let lot_summaries: Vec<LotSummary> = lots
        .iter()
        .map(|lot| {
            let own: Vec<&ParkingSpot> = spots.iter().filter(|s| s.lot_id == lot.id).collect();
            let lot_occupied = own.iter().filter(|s| s.is_occupied).count() as u32;
            let in_lot = reservations_in_lot(&reservations, lot.id, &spot_lots);
            let lot_revenue = analytics::total_revenue(&in_lot);
            LotSummary {
                id: lot.id,
                name: lot.name.clone(),
                capacity: lot.capacity as u32,
                occupied: lot_occupied,
                available: own.len() as u32 - lot_occupied,
                total_revenue: lot_revenue,
                is_archive: lot.is_archive(),
            }
        })
        .collect();

    let summary = AnalyticsSummary {
        occupancy,
        revenue,
        lots: lot_summaries,
    };

    let payload = serde_json::to_value(&summary).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        )
    })?;

    state.cache.put(CacheKey::AdminAnalytics, payload.clone());
    Ok(Json(ApiResponse::success(payload)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lots/{id}/analytics",
    tag = "Analytics",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lot ID")),
    responses(
        (status = 200, description = "Lot usage and revenue", body = ApiResponse<LotAnalytics>),
        (status = 404, description = "Lot not found"),
        (status = 403, description = "Admin access required")
    )
)]
pub async fn lot_analytics(
    State(state): State<AnalyticsState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<LotAnalytics>>, (StatusCode, Json<ApiResponse<LotAnalytics>>)> {
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
    let all_reservations = state
        .storage
        .list_all_reservations()
        .await
        .map_err(domain_error)?;
    let spot_lots = spot_to_lot(&spots);
    let in_lot = reservations_in_lot(&all_reservations, lot.id, &spot_lots);

    let occupied = spots.iter().filter(|s| s.is_occupied).count() as u32;
    let now = Utc::now();
    let today = now.date_naive();

    let response = LotAnalytics {
        lot_id: lot.id,
        lot_name: lot.name.clone(),
        capacity: lot.capacity as u32,
        occupied,
        occupancy_rate: occupancy_rate(occupied, spots.len() as u32),
        total_revenue: analytics::total_revenue(&in_lot),
        bookings_today: analytics::bookings_on(&in_lot, today) as u64,
        bookings_this_month: analytics::bookings_in_month(&in_lot, now.year(), now.month()) as u64,
        average_duration_minutes: analytics::average_duration_minutes(&in_lot),
        daily_revenue: to_series(analytics::revenue_by_start_day(
            &in_lot,
            today,
            REVENUE_SERIES_DAYS,
        )),
    };

    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/summary",
    tag = "Analytics",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Spending overview for the current user", body = ApiResponse<UserSummary>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_summary(
    State(state): State<AnalyticsState>,
    user: Option<axum::Extension<AuthenticatedUser>>,
) -> Result<Json<ApiResponse<UserSummary>>, (StatusCode, Json<ApiResponse<UserSummary>>)> {
    let Some(user) = user else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Not authenticated")),
        ));
    };

    let reservations = state
        .storage
        .list_reservations_for_user(&user.user_id)
        .await
        .map_err(domain_error)?;
    let mut lots = state.storage.list_lots().await.map_err(domain_error)?;
    sort_for_display(&mut lots);
    let spots = state.storage.list_all_spots().await.map_err(domain_error)?;
    let spot_lots = spot_to_lot(&spots);

    let by_lot: Vec<LotSpend> = lots
        .iter()
        .filter_map(|lot| {
            let in_lot = reservations_in_lot(&reservations, lot.id, &spot_lots);
            let amount = analytics::total_revenue(&in_lot);
            (amount > 0.0).then(|| LotSpend {
                lot_id: lot.id,
                lot_name: lot.name.clone(),
                amount,
            })
        })
        .collect();

    let today = Utc::now().date_naive();
    let response = UserSummary {
        total_spent: analytics::total_revenue(&reservations),
        by_lot,
        daily_spend: to_series(analytics::revenue_by_day(
            &reservations,
            today,
            REVENUE_SERIES_DAYS,
        )),
        lots: lots
            .iter()
            .map(|l| LotRef {
                id: l.id,
                name: l.name.clone(),
            })
            .collect(),
    };

    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/me/lots/{id}/analytics",
    tag = "Analytics",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Lot ID")),
    responses(
        (status = 200, description = "Current user's activity in one lot", body = ApiResponse<UserLotAnalytics>),
        (status = 404, description = "Lot not found"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_lot_analytics(
    State(state): State<AnalyticsState>,
    user: Option<axum::Extension<AuthenticatedUser>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserLotAnalytics>>, (StatusCode, Json<ApiResponse<UserLotAnalytics>>)>
{
    let Some(user) = user else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Not authenticated")),
        ));
    };

    let lot = state.storage.get_lot(id).await.map_err(domain_error)?;
    let Some(lot) = lot else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Lot {} not found", id))),
        ));
    };

    let reservations = state
        .storage
        .list_reservations_for_user(&user.user_id)
        .await
        .map_err(domain_error)?;
    let spots = state
        .storage
        .list_spots_for_lot(lot.id)
        .await
        .map_err(domain_error)?;
    let spot_lots = spot_to_lot(&spots);
    let in_lot = reservations_in_lot(&reservations, lot.id, &spot_lots);

    let now = Utc::now();
    let today = now.date_naive();

    let response = UserLotAnalytics {
        lot_id: lot.id,
        lot_name: lot.name.clone(),
        total_spent: analytics::total_revenue(&in_lot),
        bookings_today: analytics::bookings_on(&in_lot, today) as u64,
        bookings_last_30_days: analytics::bookings_since(&in_lot, now - Duration::days(30)) as u64,
        average_duration_minutes: analytics::average_duration_minutes(&in_lot),
        daily_spend: to_series(analytics::revenue_by_day(&in_lot, today, REVENUE_SERIES_DAYS)),
    };

    Ok(Json(ApiResponse::success(response)))
}
