//! Storage trait definitions

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{DomainResult, ParkingLot, ParkingSpot, Reservation, SpotRelocation, User};

/// Storage trait for persistence operations
#[async_trait]
pub trait Storage: Send + Sync {
    // Parking lot operations
    /// Insert a lot together with its initial spots, atomically.
    /// Returns the stored lot with its assigned id.
    async fn create_lot(&self, lot: ParkingLot, spot_labels: Vec<String>) -> DomainResult<ParkingLot>;
    async fn get_lot(&self, id: i32) -> DomainResult<Option<ParkingLot>>;
    async fn get_lot_by_name(&self, name: &str) -> DomainResult<Option<ParkingLot>>;
    async fn update_lot(&self, lot: ParkingLot) -> DomainResult<()>;
    /// Delete a lot. Remaining spots go with it; reservation rows stay.
    async fn delete_lot(&self, id: i32) -> DomainResult<()>;
    async fn list_lots(&self) -> DomainResult<Vec<ParkingLot>>;

    // Spot operations
    async fn list_spots_for_lot(&self, lot_id: i32) -> DomainResult<Vec<ParkingSpot>>;
    async fn list_all_spots(&self) -> DomainResult<Vec<ParkingSpot>>;
    async fn get_spot(&self, id: i32) -> DomainResult<Option<ParkingSpot>>;
    async fn add_spots(&self, lot_id: i32, labels: Vec<String>) -> DomainResult<()>;
    async fn delete_spots(&self, spot_ids: Vec<i32>) -> DomainResult<()>;
    /// Move spots into another lot under new labels, marking them occupied.
    async fn relocate_spots(&self, moves: Vec<SpotRelocation>) -> DomainResult<()>;

    // Reservation operations
    /// Reserve `quantity` free spots of a lot in one transaction: the
    /// lowest-id free spots are marked occupied and one active reservation
    /// per spot is inserted, all sharing `start_time`. Fails with `LotFull`
    /// when no spot is free and `InsufficientSpots` when some but not
    /// enough are, without allocating anything.
    async fn allocate_reservations(
        &self,
        lot_id: i32,
        user_id: &str,
        quantity: u32,
        start_time: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>>;
    async fn get_reservation(&self, id: i32) -> DomainResult<Option<Reservation>>;
    /// Close a reservation: set end time and cost, clear the active flag
    /// and free the spot, atomically.
    async fn close_reservation(&self, id: i32, end_time: DateTime<Utc>, total_cost: f64) -> DomainResult<()>;
    async fn find_active_reservation_for_spot(&self, spot_id: i32) -> DomainResult<Option<Reservation>>;
    async fn list_reservations_for_user(&self, user_id: &str) -> DomainResult<Vec<Reservation>>;
    async fn list_all_reservations(&self) -> DomainResult<Vec<Reservation>>;
    async fn count_active_reservations_for_lot(&self, lot_id: i32) -> DomainResult<u64>;
    async fn count_reservations_for_lot(&self, lot_id: i32) -> DomainResult<u64>;

    // User operations
    async fn save_user(&self, user: User) -> DomainResult<()>;
    async fn get_user(&self, id: &str) -> DomainResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    /// Update scalar account fields. Roles change via `assign_role`.
    async fn update_user(&self, user: User) -> DomainResult<()>;
    async fn list_users(&self) -> DomainResult<Vec<User>>;

    // Role operations
    async fn ensure_role(&self, name: &str, description: &str) -> DomainResult<()>;
    async fn assign_role(&self, user_id: &str, role_name: &str) -> DomainResult<()>;
}
