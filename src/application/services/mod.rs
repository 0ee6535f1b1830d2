//! Application services

pub mod analytics;
mod lots;
mod reservations;
mod users;

pub use lots::{LotService, LotUpdate, NewLot};
pub use reservations::{ReservationService, MAX_SPOTS_PER_BOOKING};
pub use users::{ProfileUpdate, UserService};
