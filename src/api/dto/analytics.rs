//! Analytics DTOs for the admin dashboard and per-user summaries.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fleet-wide dashboard payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyticsSummary {
    pub occupancy: OccupancySummary,
    pub revenue: RevenueSummary,
    pub lots: Vec<LotSummary>,
}

/// Occupancy across operational lots. Archived spots are not counted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OccupancySummary {
    pub total_spots: u32,
    pub occupied: u32,
    pub available: u32,
    pub occupancy_rate: f64,
}

/// Revenue across the whole system, archived history included.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RevenueSummary {
    pub total_revenue: f64,
    pub total_reservations: u64,
    pub active_reservations: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LotSummary {
    pub id: i32,
    pub name: String,
    pub capacity: u32,
    pub occupied: u32,
    pub available: u32,
    pub total_revenue: f64,
    pub is_archive: bool,
}

/// Detailed analytics for one lot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LotAnalytics {
    pub lot_id: i32,
    pub lot_name: String,
    pub capacity: u32,
    pub occupied: u32,
    pub occupancy_rate: f64,
    pub total_revenue: f64,
    pub bookings_today: u64,
    pub bookings_this_month: u64,
    pub average_duration_minutes: Option<f64>,
    pub daily_revenue: Vec<DailyRevenueDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyRevenueDto {
    /// ISO date, e.g. "2025-03-10".
    pub date: String,
    pub revenue: f64,
}

/// Spending overview for the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub total_spent: f64,
    pub by_lot: Vec<LotSpend>,
    pub daily_spend: Vec<DailyRevenueDto>,
    pub lots: Vec<LotRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LotSpend {
    pub lot_id: i32,
    pub lot_name: String,
    pub amount: f64,
}

/// Minimal lot reference for populating selection dropdowns.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LotRef {
    pub id: i32,
    pub name: String,
}

/// One user's activity within a single lot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserLotAnalytics {
    pub lot_id: i32,
    pub lot_name: String,
    pub total_spent: f64,
    pub bookings_today: u64,
    pub bookings_last_30_days: u64,
    pub average_duration_minutes: Option<f64>,
    pub daily_spend: Vec<DailyRevenueDto>,
}
