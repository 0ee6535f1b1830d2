//! Reservation DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{ParkingLot, ParkingSpot, Reservation};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReserveRequest {
    pub lot_id: i32,
    #[validate(range(min = 1, max = 10, message = "quantity must be between 1 and 10"))]
    pub quantity: u32,
}

/// A reservation with the lot and spot labels resolved for display.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationDto {
    pub id: i32,
    pub spot_id: i32,
    pub spot_number: String,
    pub lot_name: String,
    pub user_id: String,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    pub active: bool,
}

impl ReservationDto {
    /// Resolves spot and lot labels from preloaded listings. Spots that no
    /// longer exist (removed by a capacity shrink) render as "-".
    pub fn from_reservation(
        r: &Reservation,
        spots: &[ParkingSpot],
        lots: &[ParkingLot],
    ) -> Self {
        let spot = spots.iter().find(|s| s.id == r.spot_id);
        let lot = spot.and_then(|s| lots.iter().find(|l| l.id == s.lot_id));
        Self {
            id: r.id,
            spot_id: r.spot_id,
            spot_number: spot.map(|s| s.spot_number.clone()).unwrap_or_else(|| "-".into()),
            lot_name: lot.map(|l| l.name.clone()).unwrap_or_else(|| "-".into()),
            user_id: r.user_id.clone(),
            start_time: r.start_time.to_rfc3339(),
            end_time: r.end_time.map(|t| t.to_rfc3339()),
            total_cost: r.total_cost,
            active: r.active,
        }
    }
}
