//! Parking lot management service

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::{
    archive_label, spot_label, DomainError, DomainResult, ParkingLot, SpotRelocation,
    ARCHIVE_LOT_ADDRESS, ARCHIVE_LOT_NAME, ARCHIVE_LOT_PIN,
};
use crate::infrastructure::Storage;

/// Fields for creating a lot
#[derive(Debug, Clone)]
pub struct NewLot {
    pub name: String,
    pub address: String,
    pub pin_code: String,
    pub price_per_hour: f64,
    pub capacity: i32,
}

/// Partial lot update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct LotUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub pin_code: Option<String>,
    pub price_per_hour: Option<f64>,
    pub capacity: Option<i32>,
}

/// Service for lot CRUD, capacity resizing and archival deletion
pub struct LotService {
    storage: Arc<dyn Storage>,
}

impl LotService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Create a lot together with its numbered spots.
    pub async fn create_lot(&self, new_lot: NewLot) -> DomainResult<ParkingLot> {
        if new_lot.name == ARCHIVE_LOT_NAME {
            return Err(DomainError::Validation("this lot name is reserved".to_string()));
        }
        if new_lot.capacity < 1 {
            return Err(DomainError::Validation("capacity must be at least 1".to_string()));
        }
        if new_lot.price_per_hour < 0.0 {
            return Err(DomainError::Validation(
                "price per hour cannot be negative".to_string(),
            ));
        }

        let labels: Vec<String> = (1..=new_lot.capacity as u32)
            .map(|n| spot_label(&new_lot.name, n))
            .collect();

        let lot = ParkingLot {
            id: 0,
            name: new_lot.name,
            address: new_lot.address,
            pin_code: new_lot.pin_code,
            price_per_hour: new_lot.price_per_hour,
            capacity: new_lot.capacity,
            created_at: Utc::now(),
            updated_at: None,
        };

        self.storage.create_lot(lot, labels).await
    }

    /// Apply a partial update, resizing the spot pool when capacity changes.
    pub async fn update_lot(&self, id: i32, update: LotUpdate) -> DomainResult<ParkingLot> {
        let mut lot = self
            .storage
            .get_lot(id)
            .await?
            .ok_or_else(|| DomainError::not_found("parking lot", "id", id.to_string()))?;

        if lot.is_archive() {
            return Err(DomainError::ArchiveProtected("edited"));
        }

        if let Some(name) = update.name {
            if name == ARCHIVE_LOT_NAME {
                return Err(DomainError::Validation("this lot name is reserved".to_string()));
            }
            if name != lot.name {
                if self.storage.get_lot_by_name(&name).await?.is_some() {
                    return Err(DomainError::Conflict(format!("lot '{}'", name)));
                }
                lot.name = name;
            }
        }
        if let Some(address) = update.address {
            lot.address = address;
        }
        if let Some(pin_code) = update.pin_code {
            lot.pin_code = pin_code;
        }
        if let Some(price) = update.price_per_hour {
            if price < 0.0 {
                return Err(DomainError::Validation(
                    "price per hour cannot be negative".to_string(),
                ));
            }
            lot.price_per_hour = price;
        }

        if let Some(new_capacity) = update.capacity {
            if new_capacity < 1 {
                return Err(DomainError::Validation("capacity must be at least 1".to_string()));
            }
            self.resize(&lot, new_capacity).await?;
            lot.capacity = new_capacity;
        }

        lot.updated_at = Some(Utc::now());
        self.storage.update_lot(lot.clone()).await?;
        Ok(lot)
    }

    /// Grow appends numbered spots; shrink removes the newest free spots.
    async fn resize(&self, lot: &ParkingLot, new_capacity: i32) -> DomainResult<()> {
        let spots = self.storage.list_spots_for_lot(lot.id).await?;
        let current = spots.len() as i32;
        let occupied = spots.iter().filter(|s| s.is_occupied).count() as u64;

        if (new_capacity as u64) < occupied {
            return Err(DomainError::CapacityBelowOccupied { occupied });
        }

        if new_capacity > current {
            let labels: Vec<String> = (current as u32 + 1..=new_capacity as u32)
                .map(|n| spot_label(&lot.name, n))
                .collect();
            self.storage.add_spots(lot.id, labels).await?;
        } else if new_capacity < current {
            let mut free: Vec<i32> = spots
                .iter()
                .filter(|s| !s.is_occupied)
                .map(|s| s.id)
                .collect();
            free.sort_unstable_by(|a, b| b.cmp(a));
            let to_remove = (current - new_capacity) as usize;
            let doomed: Vec<i32> = free.into_iter().take(to_remove).collect();
            self.storage.delete_spots(doomed).await?;
        }

        Ok(())
    }

    /// Delete a lot. With billing history its spots are first moved into
    /// the archive lot; reservation rows are never deleted.
    pub async fn delete_lot(&self, id: i32) -> DomainResult<()> {
        let lot = self
            .storage
            .get_lot(id)
            .await?
            .ok_or_else(|| DomainError::not_found("parking lot", "id", id.to_string()))?;

        if lot.is_archive() {
            return Err(DomainError::ArchiveProtected("deleted"));
        }

        let active = self.storage.count_active_reservations_for_lot(id).await?;
        if active > 0 {
            return Err(DomainError::Validation(format!(
                "lot has {} active reservation(s)",
                active
            )));
        }

        let history = self.storage.count_reservations_for_lot(id).await?;
        if history > 0 {
            self.archive_spots(&lot).await?;
        }

        self.storage.delete_lot(id).await
    }

    /// Move every spot into the archive lot under a collision-free label.
    /// Relocated spots are permanently occupied; the archive capacity is
    /// kept equal to its spot count.
    async fn archive_spots(&self, lot: &ParkingLot) -> DomainResult<()> {
        let mut archive = self.get_or_create_archive().await?;
        let spots = self.storage.list_spots_for_lot(lot.id).await?;
        let moved_at = Utc::now();

        let moves: Vec<SpotRelocation> = spots
            .iter()
            .map(|s| SpotRelocation {
                spot_id: s.id,
                target_lot_id: archive.id,
                new_label: archive_label(&lot.name, &s.spot_number, moved_at),
            })
            .collect();
        let moved = moves.len();
        self.storage.relocate_spots(moves).await?;

        archive.capacity = self.storage.list_spots_for_lot(archive.id).await?.len() as i32;
        archive.updated_at = Some(moved_at);
        self.storage.update_lot(archive).await?;

        info!("Archived {} spot(s) from lot '{}'", moved, lot.name);
        Ok(())
    }

    async fn get_or_create_archive(&self) -> DomainResult<ParkingLot> {
        if let Some(archive) = self.storage.get_lot_by_name(ARCHIVE_LOT_NAME).await? {
            return Ok(archive);
        }

        let archive = ParkingLot {
            id: 0,
            name: ARCHIVE_LOT_NAME.to_string(),
            address: ARCHIVE_LOT_ADDRESS.to_string(),
            pin_code: ARCHIVE_LOT_PIN.to_string(),
            price_per_hour: 0.0,
            capacity: 0,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.storage.create_lot(archive, Vec::new()).await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryStorage;

    fn service() -> (LotService, Arc<InMemoryStorage>) {
        let storage = Arc::new(InMemoryStorage::new());
        (LotService::new(storage.clone()), storage)
    }

    fn new_lot(name: &str, capacity: i32) -> NewLot {
        NewLot {
            name: name.to_string(),
            address: "1 Main St".to_string(),
            pin_code: "12345".to_string(),
            price_per_hour: 10.0,
            capacity,
        }
    }

    #[tokio::test]
    async fn create_lot_creates_numbered_spots() {
        let (service, storage) = service();
        let lot = service.create_lot(new_lot("Central", 3)).await.unwrap();

        let spots = storage.list_spots_for_lot(lot.id).await.unwrap();
        let labels: Vec<&str> = spots.iter().map(|s| s.spot_number.as_str()).collect();
        assert_eq!(labels, vec!["CEN-1", "CEN-2", "CEN-3"]);
        assert!(spots.iter().all(|s| !s.is_occupied));
    }

    #[tokio::test]
    async fn create_lot_rejects_reserved_name() {
        let (service, _) = service();
        let err = service.create_lot(new_lot(ARCHIVE_LOT_NAME, 1)).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn create_lot_rejects_duplicate_name() {
        let (service, _) = service();
        service.create_lot(new_lot("Central", 1)).await.unwrap();
        let err = service.create_lot(new_lot("Central", 1)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn grow_appends_spots_with_continuing_numbers() {
        let (service, storage) = service();
        let lot = service.create_lot(new_lot("Central", 2)).await.unwrap();

        let updated = service
            .update_lot(
                lot.id,
                LotUpdate {
                    capacity: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.capacity, 4);
        let spots = storage.list_spots_for_lot(lot.id).await.unwrap();
        let labels: Vec<&str> = spots.iter().map(|s| s.spot_number.as_str()).collect();
        assert_eq!(labels, vec!["CEN-1", "CEN-2", "CEN-3", "CEN-4"]);
    }

    #[tokio::test]
    async fn shrink_removes_newest_free_spots_first() {
        let (service, storage) = service();
        let lot = service.create_lot(new_lot("Central", 4)).await.unwrap();
        // Occupies the lowest-id spot
        storage
            .allocate_reservations(lot.id, "user-1", 1, Utc::now())
            .await
            .unwrap();

        service
            .update_lot(
                lot.id,
                LotUpdate {
                    capacity: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let spots = storage.list_spots_for_lot(lot.id).await.unwrap();
        let labels: Vec<&str> = spots.iter().map(|s| s.spot_number.as_str()).collect();
        assert_eq!(labels, vec!["CEN-1", "CEN-2"]);
        assert!(spots[0].is_occupied);
    }

    #[tokio::test]
    async fn shrink_below_occupied_count_is_rejected() {
        let (service, storage) = service();
        let lot = service.create_lot(new_lot("Central", 3)).await.unwrap();
        storage
            .allocate_reservations(lot.id, "user-1", 2, Utc::now())
            .await
            .unwrap();

        let err = service
            .update_lot(
                lot.id,
                LotUpdate {
                    capacity: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::CapacityBelowOccupied { occupied: 2 }));
        // Nothing was removed
        assert_eq!(storage.list_spots_for_lot(lot.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn shrink_never_deletes_occupied_spots() {
        let (service, storage) = service();
        let lot = service.create_lot(new_lot("Central", 5)).await.unwrap();
        storage
            .allocate_reservations(lot.id, "user-1", 2, Utc::now())
            .await
            .unwrap();

        service
            .update_lot(
                lot.id,
                LotUpdate {
                    capacity: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let spots = storage.list_spots_for_lot(lot.id).await.unwrap();
        assert_eq!(spots.len(), 2);
        assert!(spots.iter().all(|s| s.is_occupied));
    }

    #[tokio::test]
    async fn update_rejects_archive_lot() {
        let (service, storage) = service();
        let lot = service.create_lot(new_lot("Central", 1)).await.unwrap();
        let res = storage
            .allocate_reservations(lot.id, "user-1", 1, Utc::now())
            .await
            .unwrap();
        storage
            .close_reservation(res[0].id, Utc::now(), 10.0)
            .await
            .unwrap();
        service.delete_lot(lot.id).await.unwrap();

        let archive = storage.get_lot_by_name(ARCHIVE_LOT_NAME).await.unwrap().unwrap();
        let err = service
            .update_lot(
                archive.id,
                LotUpdate {
                    address: Some("elsewhere".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ArchiveProtected("edited")));

        let err = service.delete_lot(archive.id).await.unwrap_err();
        assert!(matches!(err, DomainError::ArchiveProtected("deleted")));
    }

    #[tokio::test]
    async fn delete_with_active_reservation_is_rejected() {
        let (service, storage) = service();
        let lot = service.create_lot(new_lot("Central", 2)).await.unwrap();
        storage
            .allocate_reservations(lot.id, "user-1", 1, Utc::now())
            .await
            .unwrap();

        let err = service.delete_lot(lot.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(storage.get_lot(lot.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_without_history_removes_lot_outright() {
        let (service, storage) = service();
        let lot = service.create_lot(new_lot("Central", 2)).await.unwrap();

        service.delete_lot(lot.id).await.unwrap();

        assert!(storage.get_lot(lot.id).await.unwrap().is_none());
        assert!(storage.list_all_spots().await.unwrap().is_empty());
        assert!(storage.get_lot_by_name(ARCHIVE_LOT_NAME).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_with_history_archives_spots_and_keeps_reservations() {
        let (service, storage) = service();
        let lot = service.create_lot(new_lot("Central", 2)).await.unwrap();
        let res = storage
            .allocate_reservations(lot.id, "user-1", 1, Utc::now())
            .await
            .unwrap();
        storage
            .close_reservation(res[0].id, Utc::now(), 10.0)
            .await
            .unwrap();

        service.delete_lot(lot.id).await.unwrap();

        assert!(storage.get_lot(lot.id).await.unwrap().is_none());
        let archive = storage.get_lot_by_name(ARCHIVE_LOT_NAME).await.unwrap().unwrap();
        let spots = storage.list_spots_for_lot(archive.id).await.unwrap();
        assert_eq!(spots.len(), 2);
        assert!(spots.iter().all(|s| s.is_occupied));
        assert!(spots.iter().all(|s| s.spot_number.starts_with("Centr_")));
        assert_eq!(archive.capacity, 2);

        // Billing history survives
        let history = storage.list_all_reservations().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].total_cost, Some(10.0));
    }

    #[tokio::test]
    async fn second_archival_extends_the_same_archive_lot() {
        let (service, storage) = service();
        for name in ["Alpha", "Beta"] {
            let lot = service.create_lot(new_lot(name, 1)).await.unwrap();
            let res = storage
                .allocate_reservations(lot.id, "user-1", 1, Utc::now())
                .await
                .unwrap();
            storage
                .close_reservation(res[0].id, Utc::now(), 5.0)
                .await
                .unwrap();
            service.delete_lot(lot.id).await.unwrap();
        }

        let archive = storage.get_lot_by_name(ARCHIVE_LOT_NAME).await.unwrap().unwrap();
        let spots = storage.list_spots_for_lot(archive.id).await.unwrap();
        assert_eq!(spots.len(), 2);
        assert_eq!(archive.capacity, 2);
    }

    #[tokio::test]
    async fn rename_to_reserved_name_is_rejected() {
        let (service, _) = service();
        let lot = service.create_lot(new_lot("Central", 1)).await.unwrap();
        let err = service
            .update_lot(
                lot.id,
                LotUpdate {
                    name: Some(ARCHIVE_LOT_NAME.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn update_changes_rate_and_sets_updated_at() {
        let (service, storage) = service();
        let lot = service.create_lot(new_lot("Central", 1)).await.unwrap();

        let updated = service
            .update_lot(
                lot.id,
                LotUpdate {
                    price_per_hour: Some(12.5),
                    address: Some("2 Side St".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price_per_hour, 12.5);
        assert_eq!(updated.address, "2 Side St");
        assert!(updated.updated_at.is_some());
        let stored = storage.get_lot(lot.id).await.unwrap().unwrap();
        assert_eq!(stored.price_per_hour, 12.5);
    }
}
