//! In-memory storage implementation

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::Storage;
use crate::domain::{
    DomainError, DomainResult, ParkingLot, ParkingSpot, Reservation, SpotRelocation, User,
};

/// In-memory storage for development and testing
pub struct InMemoryStorage {
    lots: DashMap<i32, ParkingLot>,
    spots: DashMap<i32, ParkingSpot>,
    reservations: DashMap<i32, Reservation>,
    users: DashMap<String, User>,
    roles: DashMap<String, String>,
    lot_counter: AtomicI32,
    spot_counter: AtomicI32,
    reservation_counter: AtomicI32,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            lots: DashMap::new(),
            spots: DashMap::new(),
            reservations: DashMap::new(),
            users: DashMap::new(),
            roles: DashMap::new(),
            lot_counter: AtomicI32::new(1),
            spot_counter: AtomicI32::new(1),
            reservation_counter: AtomicI32::new(1),
        }
    }

    fn spot_ids_of_lot(&self, lot_id: i32) -> Vec<i32> {
        self.spots
            .iter()
            .filter(|s| s.lot_id == lot_id)
            .map(|s| s.id)
            .collect()
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_lot(&self, lot: ParkingLot, spot_labels: Vec<String>) -> DomainResult<ParkingLot> {
        if self.get_lot_by_name(&lot.name).await?.is_some() {
            return Err(DomainError::Conflict(format!("lot '{}'", lot.name)));
        }
        let id = self.lot_counter.fetch_add(1, Ordering::SeqCst);
        let stored = ParkingLot { id, ..lot };
        self.lots.insert(id, stored.clone());
        for label in spot_labels {
            let spot_id = self.spot_counter.fetch_add(1, Ordering::SeqCst);
            self.spots.insert(
                spot_id,
                ParkingSpot {
                    id: spot_id,
                    lot_id: id,
                    spot_number: label,
                    is_occupied: false,
                },
            );
        }
        Ok(stored)
    }

    async fn get_lot(&self, id: i32) -> DomainResult<Option<ParkingLot>> {
        Ok(self.lots.get(&id).map(|l| l.clone()))
    }

    async fn get_lot_by_name(&self, name: &str) -> DomainResult<Option<ParkingLot>> {
        Ok(self.lots.iter().find(|l| l.name == name).map(|l| l.clone()))
    }

    async fn update_lot(&self, lot: ParkingLot) -> DomainResult<()> {
        if !self.lots.contains_key(&lot.id) {
            return Err(DomainError::not_found("parking lot", "id", lot.id.to_string()));
        }
        self.lots.insert(lot.id, lot);
        Ok(())
    }

    async fn delete_lot(&self, id: i32) -> DomainResult<()> {
        if self.lots.remove(&id).is_none() {
            return Err(DomainError::not_found("parking lot", "id", id.to_string()));
        }
        self.spots.retain(|_, s| s.lot_id != id);
        Ok(())
    }

    async fn list_lots(&self) -> DomainResult<Vec<ParkingLot>> {
        let mut lots: Vec<ParkingLot> = self.lots.iter().map(|l| l.clone()).collect();
        lots.sort_by_key(|l| l.id);
        Ok(lots)
    }

    async fn list_spots_for_lot(&self, lot_id: i32) -> DomainResult<Vec<ParkingSpot>> {
        let mut spots: Vec<ParkingSpot> = self
            .spots
            .iter()
            .filter(|s| s.lot_id == lot_id)
            .map(|s| s.clone())
            .collect();
        spots.sort_by_key(|s| s.id);
        Ok(spots)
    }

    async fn list_all_spots(&self) -> DomainResult<Vec<ParkingSpot>> {
        let mut spots: Vec<ParkingSpot> = self.spots.iter().map(|s| s.clone()).collect();
        spots.sort_by_key(|s| s.id);
        Ok(spots)
    }

    async fn get_spot(&self, id: i32) -> DomainResult<Option<ParkingSpot>> {
        Ok(self.spots.get(&id).map(|s| s.clone()))
    }

    async fn add_spots(&self, lot_id: i32, labels: Vec<String>) -> DomainResult<()> {
        if !self.lots.contains_key(&lot_id) {
            return Err(DomainError::not_found("parking lot", "id", lot_id.to_string()));
        }
        for label in labels {
            let spot_id = self.spot_counter.fetch_add(1, Ordering::SeqCst);
            self.spots.insert(
                spot_id,
                ParkingSpot {
                    id: spot_id,
                    lot_id,
                    spot_number: label,
                    is_occupied: false,
                },
            );
        }
        Ok(())
    }

    async fn delete_spots(&self, spot_ids: Vec<i32>) -> DomainResult<()> {
        for id in spot_ids {
            self.spots.remove(&id);
        }
        Ok(())
    }

    async fn relocate_spots(&self, moves: Vec<SpotRelocation>) -> DomainResult<()> {
        for mv in moves {
            let mut spot = self
                .spots
                .get_mut(&mv.spot_id)
                .ok_or_else(|| DomainError::not_found("parking spot", "id", mv.spot_id.to_string()))?;
            spot.lot_id = mv.target_lot_id;
            spot.spot_number = mv.new_label;
            spot.is_occupied = true;
        }
        Ok(())
    }

    async fn allocate_reservations(
        &self,
        lot_id: i32,
        user_id: &str,
        quantity: u32,
        start_time: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>> {
        let mut free: Vec<i32> = self
            .spots
            .iter()
            .filter(|s| s.lot_id == lot_id && !s.is_occupied)
            .map(|s| s.id)
            .collect();
        free.sort_unstable();

        if free.is_empty() {
            return Err(DomainError::LotFull);
        }
        if (free.len() as u32) < quantity {
            return Err(DomainError::InsufficientSpots {
                requested: quantity,
                available: free.len() as u32,
            });
        }

        let mut created = Vec::with_capacity(quantity as usize);
        for spot_id in free.into_iter().take(quantity as usize) {
            if let Some(mut spot) = self.spots.get_mut(&spot_id) {
                spot.is_occupied = true;
            }
            let id = self.reservation_counter.fetch_add(1, Ordering::SeqCst);
            let reservation = Reservation {
                id,
                ..Reservation::open(user_id, spot_id, start_time)
            };
            self.reservations.insert(id, reservation.clone());
            created.push(reservation);
        }
        Ok(created)
    }

    async fn get_reservation(&self, id: i32) -> DomainResult<Option<Reservation>> {
        Ok(self.reservations.get(&id).map(|r| r.clone()))
    }

    async fn close_reservation(&self, id: i32, end_time: DateTime<Utc>, total_cost: f64) -> DomainResult<()> {
        let spot_id = {
            let mut reservation = self
                .reservations
                .get_mut(&id)
                .ok_or_else(|| DomainError::not_found("reservation", "id", id.to_string()))?;
            reservation.close(end_time, total_cost);
            reservation.spot_id
        };
        if let Some(mut spot) = self.spots.get_mut(&spot_id) {
            spot.is_occupied = false;
        }
        Ok(())
    }

    async fn find_active_reservation_for_spot(&self, spot_id: i32) -> DomainResult<Option<Reservation>> {
        Ok(self
            .reservations
            .iter()
            .find(|r| r.spot_id == spot_id && r.active)
            .map(|r| r.clone()))
    }

    async fn list_reservations_for_user(&self, user_id: &str) -> DomainResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .reservations
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.clone())
            .collect();
        reservations.sort_by_key(|r| r.id);
        Ok(reservations)
    }

    async fn list_all_reservations(&self) -> DomainResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self.reservations.iter().map(|r| r.clone()).collect();
        reservations.sort_by_key(|r| r.id);
        Ok(reservations)
    }

    async fn count_active_reservations_for_lot(&self, lot_id: i32) -> DomainResult<u64> {
        let spot_ids = self.spot_ids_of_lot(lot_id);
        Ok(self
            .reservations
            .iter()
            .filter(|r| r.active && spot_ids.contains(&r.spot_id))
            .count() as u64)
    }

    async fn count_reservations_for_lot(&self, lot_id: i32) -> DomainResult<u64> {
        let spot_ids = self.spot_ids_of_lot(lot_id);
        Ok(self
            .reservations
            .iter()
            .filter(|r| spot_ids.contains(&r.spot_id))
            .count() as u64)
    }

    async fn save_user(&self, user: User) -> DomainResult<()> {
        if self.get_user_by_email(&user.email).await?.is_some() {
            return Err(DomainError::Conflict(format!("user '{}'", user.email)));
        }
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn get_user(&self, id: &str) -> DomainResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        Ok(self.users.iter().find(|u| u.email == email).map(|u| u.clone()))
    }

    async fn update_user(&self, user: User) -> DomainResult<()> {
        if !self.users.contains_key(&user.id) {
            return Err(DomainError::not_found("user", "id", user.id));
        }
        self.users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn list_users(&self) -> DomainResult<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn ensure_role(&self, name: &str, description: &str) -> DomainResult<()> {
        self.roles
            .entry(name.to_string())
            .or_insert_with(|| description.to_string());
        Ok(())
    }

    async fn assign_role(&self, user_id: &str, role_name: &str) -> DomainResult<()> {
        let mut user = self
            .users
            .get_mut(user_id)
            .ok_or_else(|| DomainError::not_found("user", "id", user_id.to_string()))?;
        if !user.roles.iter().any(|r| r == role_name) {
            user.roles.push(role_name.to_string());
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spot_label;

    fn lot(name: &str, capacity: i32) -> ParkingLot {
        ParkingLot {
            id: 0,
            name: name.to_string(),
            address: "addr".to_string(),
            pin_code: "12345".to_string(),
            price_per_hour: 10.0,
            capacity,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn labels(name: &str, capacity: i32) -> Vec<String> {
        (1..=capacity as u32).map(|n| spot_label(name, n)).collect()
    }

    #[tokio::test]
    async fn create_lot_assigns_id_and_spots() {
        let storage = InMemoryStorage::new();
        let stored = storage
            .create_lot(lot("Central", 3), labels("Central", 3))
            .await
            .unwrap();
        assert!(stored.id > 0);
        let spots = storage.list_spots_for_lot(stored.id).await.unwrap();
        assert_eq!(spots.len(), 3);
        assert_eq!(spots[0].spot_number, "CEN-1");
        assert!(spots.iter().all(|s| !s.is_occupied));
    }

    #[tokio::test]
    async fn duplicate_lot_name_is_rejected() {
        let storage = InMemoryStorage::new();
        storage
            .create_lot(lot("Central", 1), labels("Central", 1))
            .await
            .unwrap();
        let err = storage
            .create_lot(lot("Central", 1), labels("Central", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn allocation_marks_spots_and_shares_start_time() {
        let storage = InMemoryStorage::new();
        let stored = storage
            .create_lot(lot("Central", 3), labels("Central", 3))
            .await
            .unwrap();
        let start = Utc::now();
        let created = storage
            .allocate_reservations(stored.id, "user-1", 2, start)
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|r| r.start_time == start && r.active));
        let spots = storage.list_spots_for_lot(stored.id).await.unwrap();
        assert_eq!(spots.iter().filter(|s| s.is_occupied).count(), 2);
    }

    #[tokio::test]
    async fn close_reservation_frees_the_spot() {
        let storage = InMemoryStorage::new();
        let stored = storage
            .create_lot(lot("Central", 1), labels("Central", 1))
            .await
            .unwrap();
        let created = storage
            .allocate_reservations(stored.id, "user-1", 1, Utc::now())
            .await
            .unwrap();
        storage
            .close_reservation(created[0].id, Utc::now(), 10.0)
            .await
            .unwrap();
        let spots = storage.list_spots_for_lot(stored.id).await.unwrap();
        assert!(!spots[0].is_occupied);
        let closed = storage.get_reservation(created[0].id).await.unwrap().unwrap();
        assert!(!closed.active);
        assert_eq!(closed.total_cost, Some(10.0));
    }
}
