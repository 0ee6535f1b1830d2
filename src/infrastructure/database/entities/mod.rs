//! Database entities module

pub mod parking_lot;
pub mod parking_spot;
pub mod reservation;
pub mod role;
pub mod user;
pub mod user_role;

pub use parking_lot::Entity as ParkingLot;
pub use parking_spot::Entity as ParkingSpot;
pub use reservation::Entity as Reservation;
pub use role::Entity as Role;
pub use user::Entity as User;
pub use user_role::Entity as UserRole;
