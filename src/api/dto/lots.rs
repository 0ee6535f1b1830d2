//! Parking lot and spot DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{ParkingLot, ParkingSpot};

/// A single parking spot as returned inside lot detail responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpotDto {
    pub id: i32,
    pub lot_id: i32,
    pub spot_number: String,
    pub is_occupied: bool,
}

impl From<ParkingSpot> for SpotDto {
    fn from(s: ParkingSpot) -> Self {
        Self {
            id: s.id,
            lot_id: s.lot_id,
            spot_number: s.spot_number,
            is_occupied: s.is_occupied,
        }
    }
}

/// Full lot representation for admin endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LotDto {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub pin_code: String,
    pub price_per_hour: f64,
    pub capacity: i32,
    pub available_spots: u32,
    pub is_archive: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spots: Option<Vec<SpotDto>>,
}

impl LotDto {
    pub fn from_lot(lot: ParkingLot, spots: &[ParkingSpot]) -> Self {
        let available = spots.iter().filter(|s| !s.is_occupied).count() as u32;
        Self {
            id: lot.id,
            name: lot.name.clone(),
            address: lot.address.clone(),
            pin_code: lot.pin_code.clone(),
            price_per_hour: lot.price_per_hour,
            capacity: lot.capacity,
            available_spots: available,
            is_archive: lot.is_archive(),
            created_at: lot.created_at.to_rfc3339(),
            updated_at: lot.updated_at.map(|t| t.to_rfc3339()),
            spots: None,
        }
    }

    pub fn with_spots(mut self, spots: Vec<ParkingSpot>) -> Self {
        self.spots = Some(spots.into_iter().map(SpotDto::from).collect());
        self
    }
}

/// Compact lot view for the booking screen.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvailableLotDto {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub pin_code: String,
    pub price_per_hour: f64,
    pub available_spots: u32,
}

impl AvailableLotDto {
    pub fn from_lot(lot: &ParkingLot, spots: &[ParkingSpot]) -> Self {
        let available = spots
            .iter()
            .filter(|s| s.lot_id == lot.id && !s.is_occupied)
            .count() as u32;
        Self {
            id: lot.id,
            name: lot.name.clone(),
            address: lot.address.clone(),
            pin_code: lot.pin_code.clone(),
            price_per_hour: lot.price_per_hour,
            available_spots: available,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLotRequest {
    #[validate(length(min = 1, max = 100, message = "lot name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 200, message = "address is required"))]
    pub address: String,
    #[validate(length(min = 1, max = 20, message = "pin code is required"))]
    pub pin_code: String,
    #[validate(range(min = 0.0, message = "price_per_hour must be non-negative"))]
    pub price_per_hour: f64,
    #[validate(range(min = 1, message = "capacity must be at least 1"))]
    pub capacity: u32,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateLotRequest {
    #[validate(length(min = 1, max = 100, message = "lot name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200, message = "address must not be empty"))]
    pub address: Option<String>,
    #[validate(length(min = 1, max = 20, message = "pin code must not be empty"))]
    pub pin_code: Option<String>,
    #[validate(range(min = 0.0, message = "price_per_hour must be non-negative"))]
    pub price_per_hour: Option<f64>,
    #[validate(range(min = 1, message = "capacity must be at least 1"))]
    pub capacity: Option<u32>,
}

/// Occupancy detail for a single spot, including who holds it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SpotStatusDto {
    pub id: i32,
    pub spot_number: String,
    pub is_occupied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation: Option<ActiveReservationDto>,
}

/// The reservation currently occupying a spot. Cost is unset until release.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActiveReservationDto {
    pub id: i32,
    pub user_id: String,
    pub user_email: String,
    pub start_time: String,
    pub total_cost: Option<f64>,
}
