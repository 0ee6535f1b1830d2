//! Domain layer - entities and business rules

pub mod billing;
pub mod error;
pub mod lot;
pub mod reservation;
pub mod spot;
pub mod user;

// Re-export commonly used types
pub use error::{DomainError, DomainResult};
pub use lot::{
    archive_label, sort_for_display, spot_label, ParkingLot, ARCHIVE_LOT_ADDRESS,
    ARCHIVE_LOT_NAME, ARCHIVE_LOT_PIN, SPOT_LABEL_MAX,
};
pub use reservation::Reservation;
pub use spot::{ParkingSpot, SpotRelocation};
pub use user::{User, ROLE_ADMIN, ROLE_USER};
