//! Reservation booking and release service

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::billing::stay_cost;
use crate::domain::{DomainError, DomainResult, Reservation};
use crate::infrastructure::Storage;

pub const MAX_SPOTS_PER_BOOKING: u32 = 10;

/// Service for booking spots and settling the bill on release
pub struct ReservationService {
    storage: Arc<dyn Storage>,
}

impl ReservationService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Book `quantity` spots in one lot. All-or-nothing: when fewer spots
    /// are free than requested, nothing is allocated.
    pub async fn reserve(
        &self,
        lot_id: i32,
        user_id: &str,
        quantity: u32,
    ) -> DomainResult<Vec<Reservation>> {
        if quantity < 1 || quantity > MAX_SPOTS_PER_BOOKING {
            return Err(DomainError::Validation(format!(
                "quantity must be between 1 and {}",
                MAX_SPOTS_PER_BOOKING
            )));
        }
        if self.storage.get_lot(lot_id).await?.is_none() {
            return Err(DomainError::not_found("parking lot", "id", lot_id.to_string()));
        }

        let reservations = self
            .storage
            .allocate_reservations(lot_id, user_id, quantity, Utc::now())
            .await?;

        metrics::counter!("reservations_created_total").increment(quantity as u64);
        info!(
            "User {} reserved {} spot(s) in lot {}",
            user_id,
            reservations.len(),
            lot_id
        );
        Ok(reservations)
    }

    /// Release a reservation and charge for the stay. Non-admins can only
    /// release their own.
    pub async fn release(
        &self,
        reservation_id: i32,
        user_id: &str,
        is_admin: bool,
    ) -> DomainResult<Reservation> {
        let reservation = self
            .storage
            .get_reservation(reservation_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found("reservation", "id", reservation_id.to_string())
            })?;

        if !reservation.is_active() {
            return Err(DomainError::ReservationNotActive(reservation_id));
        }
        if !is_admin && reservation.user_id != user_id {
            return Err(DomainError::Forbidden(
                "reservation belongs to another user".into(),
            ));
        }

        self.close_at_lot_rate(reservation).await
    }

    /// Admin override: settle whatever reservation holds the given spot.
    pub async fn force_release_spot(&self, spot_id: i32) -> DomainResult<Reservation> {
        if self.storage.get_spot(spot_id).await?.is_none() {
            return Err(DomainError::not_found("parking spot", "id", spot_id.to_string()));
        }

        let reservation = self
            .storage
            .find_active_reservation_for_spot(spot_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found("active reservation", "spot_id", spot_id.to_string())
            })?;

        self.close_at_lot_rate(reservation).await
    }

    async fn close_at_lot_rate(&self, mut reservation: Reservation) -> DomainResult<Reservation> {
        let spot = self
            .storage
            .get_spot(reservation.spot_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found("parking spot", "id", reservation.spot_id.to_string())
            })?;
        let lot = self.storage.get_lot(spot.lot_id).await?.ok_or_else(|| {
            DomainError::not_found("parking lot", "id", spot.lot_id.to_string())
        })?;

        let end_time = Utc::now();
        let amount = stay_cost(reservation.start_time, end_time, lot.price_per_hour);
        self.storage
            .close_reservation(reservation.id, end_time, amount)
            .await?;
        reservation.close(end_time, amount);

        metrics::counter!("reservations_closed_total").increment(1);
        info!(
            "Reservation {} closed, {:.2} charged for spot {}",
            reservation.id, amount, spot.spot_number
        );
        Ok(reservation)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParkingLot;
    use crate::infrastructure::InMemoryStorage;

    async fn seed_lot(storage: &InMemoryStorage, capacity: i32, rate: f64) -> ParkingLot {
        let lot = ParkingLot {
            id: 0,
            name: "Central".to_string(),
            address: "1 Main St".to_string(),
            pin_code: "12345".to_string(),
            price_per_hour: rate,
            capacity,
            created_at: Utc::now(),
            updated_at: None,
        };
        let labels = (1..=capacity).map(|n| format!("CEN-{}", n)).collect();
        storage.create_lot(lot, labels).await.unwrap()
    }

    fn service() -> (ReservationService, Arc<InMemoryStorage>) {
        let storage = Arc::new(InMemoryStorage::new());
        (ReservationService::new(storage.clone()), storage)
    }

    #[tokio::test]
    async fn reserve_takes_lowest_numbered_free_spots() {
        let (service, storage) = service();
        let lot = seed_lot(&storage, 3, 10.0).await;

        let reservations = service.reserve(lot.id, "user-1", 2).await.unwrap();

        assert_eq!(reservations.len(), 2);
        let spots = storage.list_spots_for_lot(lot.id).await.unwrap();
        assert!(spots[0].is_occupied);
        assert!(spots[1].is_occupied);
        assert!(!spots[2].is_occupied);
        assert!(reservations.iter().all(|r| r.is_active()));
    }

    #[tokio::test]
    async fn reserve_rejects_when_not_enough_spots_without_allocating() {
        let (service, storage) = service();
        let lot = seed_lot(&storage, 2, 10.0).await;
        service.reserve(lot.id, "user-1", 1).await.unwrap();

        let err = service.reserve(lot.id, "user-2", 2).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientSpots {
                requested: 2,
                available: 1
            }
        ));

        // The one free spot stayed free
        let spots = storage.list_spots_for_lot(lot.id).await.unwrap();
        assert_eq!(spots.iter().filter(|s| s.is_occupied).count(), 1);
        assert_eq!(storage.list_all_reservations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reserve_reports_full_lot() {
        let (service, storage) = service();
        let lot = seed_lot(&storage, 1, 10.0).await;
        service.reserve(lot.id, "user-1", 1).await.unwrap();

        let err = service.reserve(lot.id, "user-2", 1).await.unwrap_err();
        assert!(matches!(err, DomainError::LotFull));
    }

    #[tokio::test]
    async fn reserve_validates_quantity_bounds() {
        let (service, storage) = service();
        let lot = seed_lot(&storage, 20, 10.0).await;

        for bad in [0, MAX_SPOTS_PER_BOOKING + 1] {
            let err = service.reserve(lot.id, "user-1", bad).await.unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
        assert!(service.reserve(lot.id, "user-1", MAX_SPOTS_PER_BOOKING).await.is_ok());
    }

    #[tokio::test]
    async fn reserve_unknown_lot_is_not_found() {
        let (service, _) = service();
        let err = service.reserve(99, "user-1", 1).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn release_charges_minimum_of_one_hour_and_frees_spot() {
        let (service, storage) = service();
        let lot = seed_lot(&storage, 1, 8.0).await;
        let reservation = service.reserve(lot.id, "user-1", 1).await.unwrap().remove(0);

        let closed = service
            .release(reservation.id, "user-1", false)
            .await
            .unwrap();

        // Released within seconds, billed the one-hour floor
        assert_eq!(closed.total_cost, Some(8.0));
        assert!(!closed.is_active());
        let spot = storage.get_spot(reservation.spot_id).await.unwrap().unwrap();
        assert!(!spot.is_occupied);
    }

    #[tokio::test]
    async fn release_of_other_users_reservation_is_forbidden() {
        let (service, storage) = service();
        let lot = seed_lot(&storage, 1, 8.0).await;
        let reservation = service.reserve(lot.id, "user-1", 1).await.unwrap().remove(0);

        let err = service
            .release(reservation.id, "user-2", false)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        // Admins may release on behalf of anyone
        assert!(service.release(reservation.id, "user-2", true).await.is_ok());
    }

    #[tokio::test]
    async fn release_twice_is_rejected() {
        let (service, storage) = service();
        let lot = seed_lot(&storage, 1, 8.0).await;
        let reservation = service.reserve(lot.id, "user-1", 1).await.unwrap().remove(0);
        service.release(reservation.id, "user-1", false).await.unwrap();

        let err = service
            .release(reservation.id, "user-1", false)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ReservationNotActive(_)));
    }

    #[tokio::test]
    async fn force_release_settles_the_active_reservation() {
        let (service, storage) = service();
        let lot = seed_lot(&storage, 1, 8.0).await;
        let reservation = service.reserve(lot.id, "user-1", 1).await.unwrap().remove(0);

        let closed = service.force_release_spot(reservation.spot_id).await.unwrap();
        assert_eq!(closed.id, reservation.id);
        assert_eq!(closed.total_cost, Some(8.0));

        let spot = storage.get_spot(reservation.spot_id).await.unwrap().unwrap();
        assert!(!spot.is_occupied);
    }

    #[tokio::test]
    async fn force_release_without_active_reservation_errors() {
        let (service, storage) = service();
        let lot = seed_lot(&storage, 1, 8.0).await;
        let spots = storage.list_spots_for_lot(lot.id).await.unwrap();

        let err = service.force_release_spot(spots[0].id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
