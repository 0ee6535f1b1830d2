//! Database storage implementation using SeaORM

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbBackend, DbErr, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info};

use super::entities::{parking_lot, parking_spot, reservation, role, user, user_role};
use crate::domain::{
    DomainError, DomainResult, ParkingLot, ParkingSpot, Reservation, SpotRelocation, User,
};
use crate::infrastructure::storage::Storage;

/// Database storage implementation
pub struct DatabaseStorage {
    db: DatabaseConnection,
}

impl DatabaseStorage {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get database connection reference
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn load_roles(&self, user_model: &user::Model) -> DomainResult<Vec<String>> {
        let roles = user_model
            .find_related(role::Entity)
            .all(&self.db)
            .await
            .map_err(db_error_to_domain)?;
        Ok(roles.into_iter().map(|r| r.name).collect())
    }

    async fn user_model_to_domain(&self, model: user::Model) -> DomainResult<User> {
        let roles = self.load_roles(&model).await?;
        Ok(User {
            id: model.id,
            email: model.email,
            username: model.username,
            password_hash: model.password_hash,
            is_active: model.is_active,
            roles,
            created_at: model.created_at,
            updated_at: model.updated_at,
            last_login_at: model.last_login_at,
        })
    }
}

// Helper functions for domain <-> entity conversion

fn db_error_to_domain(e: DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

fn lot_model_to_domain(m: parking_lot::Model) -> ParkingLot {
    ParkingLot {
        id: m.id,
        name: m.name,
        address: m.address,
        pin_code: m.pin_code,
        price_per_hour: m.price_per_hour,
        capacity: m.capacity,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn spot_model_to_domain(m: parking_spot::Model) -> ParkingSpot {
    ParkingSpot {
        id: m.id,
        lot_id: m.lot_id,
        spot_number: m.spot_number,
        is_occupied: m.is_occupied,
    }
}

fn reservation_model_to_domain(m: reservation::Model) -> Reservation {
    Reservation {
        id: m.id,
        user_id: m.user_id,
        spot_id: m.spot_id,
        start_time: m.start_time,
        end_time: m.end_time,
        total_cost: m.total_cost,
        active: m.active,
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn create_lot(&self, lot: ParkingLot, spot_labels: Vec<String>) -> DomainResult<ParkingLot> {
        debug!("Creating parking lot: {}", lot.name);

        let existing = parking_lot::Entity::find()
            .filter(parking_lot::Column::Name.eq(&lot.name))
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        if existing.is_some() {
            return Err(DomainError::Conflict(format!("lot '{}'", lot.name)));
        }

        let txn = self.db.begin().await.map_err(db_error_to_domain)?;

        let model = parking_lot::ActiveModel {
            id: NotSet,
            name: Set(lot.name),
            address: Set(lot.address),
            pin_code: Set(lot.pin_code),
            price_per_hour: Set(lot.price_per_hour),
            capacity: Set(lot.capacity),
            created_at: Set(lot.created_at),
            updated_at: Set(lot.updated_at),
        };
        let stored = model.insert(&txn).await.map_err(db_error_to_domain)?;

        for label in spot_labels {
            let spot = parking_spot::ActiveModel {
                id: NotSet,
                lot_id: Set(stored.id),
                spot_number: Set(label),
                is_occupied: Set(false),
            };
            spot.insert(&txn).await.map_err(db_error_to_domain)?;
        }

        txn.commit().await.map_err(db_error_to_domain)?;

        info!("Parking lot created: {} ({})", stored.name, stored.id);
        Ok(lot_model_to_domain(stored))
    }

    async fn get_lot(&self, id: i32) -> DomainResult<Option<ParkingLot>> {
        let model = parking_lot::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        Ok(model.map(lot_model_to_domain))
    }

    async fn get_lot_by_name(&self, name: &str) -> DomainResult<Option<ParkingLot>> {
        let model = parking_lot::Entity::find()
            .filter(parking_lot::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        Ok(model.map(lot_model_to_domain))
    }

    async fn update_lot(&self, lot: ParkingLot) -> DomainResult<()> {
        debug!("Updating parking lot: {}", lot.id);

        let existing = parking_lot::Entity::find_by_id(lot.id)
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        if existing.is_none() {
            return Err(DomainError::not_found("parking lot", "id", lot.id.to_string()));
        }

        let model = parking_lot::ActiveModel {
            id: Set(lot.id),
            name: Set(lot.name),
            address: Set(lot.address),
            pin_code: Set(lot.pin_code),
            price_per_hour: Set(lot.price_per_hour),
            capacity: Set(lot.capacity),
            created_at: Set(lot.created_at),
            updated_at: Set(lot.updated_at),
        };

        model.update(&self.db).await.map_err(db_error_to_domain)?;
        Ok(())
    }

    async fn delete_lot(&self, id: i32) -> DomainResult<()> {
        // Spots go via the FK cascade; reservation rows have no spot FK
        // and stay behind as billing history.
        let result = parking_lot::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("parking lot", "id", id.to_string()));
        }

        info!("Parking lot deleted: {}", id);
        Ok(())
    }

    async fn list_lots(&self) -> DomainResult<Vec<ParkingLot>> {
        let models = parking_lot::Entity::find()
            .order_by_asc(parking_lot::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        Ok(models.into_iter().map(lot_model_to_domain).collect())
    }

    async fn list_spots_for_lot(&self, lot_id: i32) -> DomainResult<Vec<ParkingSpot>> {
        let models = parking_spot::Entity::find()
            .filter(parking_spot::Column::LotId.eq(lot_id))
            .order_by_asc(parking_spot::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        Ok(models.into_iter().map(spot_model_to_domain).collect())
    }

    async fn list_all_spots(&self) -> DomainResult<Vec<ParkingSpot>> {
        let models = parking_spot::Entity::find()
            .order_by_asc(parking_spot::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        Ok(models.into_iter().map(spot_model_to_domain).collect())
    }

    async fn get_spot(&self, id: i32) -> DomainResult<Option<ParkingSpot>> {
        let model = parking_spot::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        Ok(model.map(spot_model_to_domain))
    }

    async fn add_spots(&self, lot_id: i32, labels: Vec<String>) -> DomainResult<()> {
        let existing = parking_lot::Entity::find_by_id(lot_id)
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        if existing.is_none() {
            return Err(DomainError::not_found("parking lot", "id", lot_id.to_string()));
        }

        let txn = self.db.begin().await.map_err(db_error_to_domain)?;
        for label in labels {
            let spot = parking_spot::ActiveModel {
                id: NotSet,
                lot_id: Set(lot_id),
                spot_number: Set(label),
                is_occupied: Set(false),
            };
            spot.insert(&txn).await.map_err(db_error_to_domain)?;
        }
        txn.commit().await.map_err(db_error_to_domain)?;

        Ok(())
    }

    async fn delete_spots(&self, spot_ids: Vec<i32>) -> DomainResult<()> {
        if spot_ids.is_empty() {
            return Ok(());
        }

        parking_spot::Entity::delete_many()
            .filter(parking_spot::Column::Id.is_in(spot_ids))
            .exec(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        Ok(())
    }

    async fn relocate_spots(&self, moves: Vec<SpotRelocation>) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_error_to_domain)?;

        for mv in moves {
            let existing = parking_spot::Entity::find_by_id(mv.spot_id)
                .one(&txn)
                .await
                .map_err(db_error_to_domain)?;

            let Some(spot) = existing else {
                return Err(DomainError::not_found("parking spot", "id", mv.spot_id.to_string()));
            };

            let mut active: parking_spot::ActiveModel = spot.into();
            active.lot_id = Set(mv.target_lot_id);
            active.spot_number = Set(mv.new_label);
            active.is_occupied = Set(true);
            active.update(&txn).await.map_err(db_error_to_domain)?;
        }

        txn.commit().await.map_err(db_error_to_domain)?;
        Ok(())
    }

    async fn allocate_reservations(
        &self,
        lot_id: i32,
        user_id: &str,
        quantity: u32,
        start_time: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>> {
        debug!("Allocating {} spot(s) in lot {} for {}", quantity, lot_id, user_id);

        let txn = self.db.begin().await.map_err(db_error_to_domain)?;

        let mut query = parking_spot::Entity::find()
            .filter(parking_spot::Column::LotId.eq(lot_id))
            .filter(parking_spot::Column::IsOccupied.eq(false))
            .order_by_asc(parking_spot::Column::Id)
            .limit(quantity as u64);
        // Row locks only exist on server backends; SQLite serializes writers.
        if self.db.get_database_backend() != DbBackend::Sqlite {
            query = query.lock_exclusive();
        }
        let free = query.all(&txn).await.map_err(db_error_to_domain)?;

        if free.is_empty() {
            return Err(DomainError::LotFull);
        }
        if (free.len() as u32) < quantity {
            return Err(DomainError::InsufficientSpots {
                requested: quantity,
                available: free.len() as u32,
            });
        }

        let mut created = Vec::with_capacity(free.len());
        for spot in free {
            let spot_id = spot.id;
            let mut active: parking_spot::ActiveModel = spot.into();
            active.is_occupied = Set(true);
            active.update(&txn).await.map_err(db_error_to_domain)?;

            let model = reservation::ActiveModel {
                id: NotSet,
                user_id: Set(user_id.to_string()),
                spot_id: Set(spot_id),
                start_time: Set(start_time),
                end_time: Set(None),
                total_cost: Set(None),
                active: Set(true),
            };
            let stored = model.insert(&txn).await.map_err(db_error_to_domain)?;
            created.push(reservation_model_to_domain(stored));
        }

        txn.commit().await.map_err(db_error_to_domain)?;

        info!("Allocated {} spot(s) in lot {} for {}", created.len(), lot_id, user_id);
        Ok(created)
    }

    async fn get_reservation(&self, id: i32) -> DomainResult<Option<Reservation>> {
        let model = reservation::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        Ok(model.map(reservation_model_to_domain))
    }

    async fn close_reservation(&self, id: i32, end_time: DateTime<Utc>, total_cost: f64) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_error_to_domain)?;

        let existing = reservation::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_error_to_domain)?;

        let Some(model) = existing else {
            return Err(DomainError::not_found("reservation", "id", id.to_string()));
        };

        let spot_id = model.spot_id;
        let mut active: reservation::ActiveModel = model.into();
        active.end_time = Set(Some(end_time));
        active.total_cost = Set(Some(total_cost));
        active.active = Set(false);
        active.update(&txn).await.map_err(db_error_to_domain)?;

        let spot = parking_spot::Entity::find_by_id(spot_id)
            .one(&txn)
            .await
            .map_err(db_error_to_domain)?;
        if let Some(spot) = spot {
            let mut active: parking_spot::ActiveModel = spot.into();
            active.is_occupied = Set(false);
            active.update(&txn).await.map_err(db_error_to_domain)?;
        }

        txn.commit().await.map_err(db_error_to_domain)?;

        info!("Reservation {} closed: total={}", id, total_cost);
        Ok(())
    }

    async fn find_active_reservation_for_spot(&self, spot_id: i32) -> DomainResult<Option<Reservation>> {
        let model = reservation::Entity::find()
            .filter(reservation::Column::SpotId.eq(spot_id))
            .filter(reservation::Column::Active.eq(true))
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        Ok(model.map(reservation_model_to_domain))
    }

    async fn list_reservations_for_user(&self, user_id: &str) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(user_id))
            .order_by_asc(reservation::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        Ok(models.into_iter().map(reservation_model_to_domain).collect())
    }

    async fn list_all_reservations(&self) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .order_by_asc(reservation::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        Ok(models.into_iter().map(reservation_model_to_domain).collect())
    }

    async fn count_active_reservations_for_lot(&self, lot_id: i32) -> DomainResult<u64> {
        reservation::Entity::find()
            .inner_join(parking_spot::Entity)
            .filter(parking_spot::Column::LotId.eq(lot_id))
            .filter(reservation::Column::Active.eq(true))
            .count(&self.db)
            .await
            .map_err(db_error_to_domain)
    }

    async fn count_reservations_for_lot(&self, lot_id: i32) -> DomainResult<u64> {
        reservation::Entity::find()
            .inner_join(parking_spot::Entity)
            .filter(parking_spot::Column::LotId.eq(lot_id))
            .count(&self.db)
            .await
            .map_err(db_error_to_domain)
    }

    async fn save_user(&self, new_user: User) -> DomainResult<()> {
        debug!("Saving user: {}", new_user.email);

        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(&new_user.email))
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        if existing.is_some() {
            return Err(DomainError::Conflict(format!("user '{}'", new_user.email)));
        }

        let txn = self.db.begin().await.map_err(db_error_to_domain)?;

        let model = user::ActiveModel {
            id: Set(new_user.id.clone()),
            email: Set(new_user.email.clone()),
            username: Set(new_user.username),
            password_hash: Set(new_user.password_hash),
            is_active: Set(new_user.is_active),
            created_at: Set(new_user.created_at),
            updated_at: Set(new_user.updated_at),
            last_login_at: Set(new_user.last_login_at),
        };
        model.insert(&txn).await.map_err(db_error_to_domain)?;

        for role_name in &new_user.roles {
            let role_model = role::Entity::find()
                .filter(role::Column::Name.eq(role_name))
                .one(&txn)
                .await
                .map_err(db_error_to_domain)?
                .ok_or_else(|| DomainError::not_found("role", "name", role_name.clone()))?;

            let link = user_role::ActiveModel {
                user_id: Set(new_user.id.clone()),
                role_id: Set(role_model.id),
            };
            link.insert(&txn).await.map_err(db_error_to_domain)?;
        }

        txn.commit().await.map_err(db_error_to_domain)?;

        info!("User saved: {}", new_user.email);
        Ok(())
    }

    async fn get_user(&self, id: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        match model {
            Some(model) => Ok(Some(self.user_model_to_domain(model).await?)),
            None => Ok(None),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        match model {
            Some(model) => Ok(Some(self.user_model_to_domain(model).await?)),
            None => Ok(None),
        }
    }

    async fn update_user(&self, updated: User) -> DomainResult<()> {
        let existing = user::Entity::find_by_id(&updated.id)
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        if existing.is_none() {
            return Err(DomainError::not_found("user", "id", updated.id));
        }

        let model = user::ActiveModel {
            id: Set(updated.id),
            email: Set(updated.email),
            username: Set(updated.username),
            password_hash: Set(updated.password_hash),
            is_active: Set(updated.is_active),
            created_at: Set(updated.created_at),
            updated_at: Set(updated.updated_at),
            last_login_at: Set(updated.last_login_at),
        };

        model.update(&self.db).await.map_err(db_error_to_domain)?;
        Ok(())
    }

    async fn list_users(&self) -> DomainResult<Vec<User>> {
        let models = user::Entity::find()
            .order_by_asc(user::Column::Email)
            .all(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        let mut users = Vec::with_capacity(models.len());
        for model in models {
            users.push(self.user_model_to_domain(model).await?);
        }
        Ok(users)
    }

    async fn ensure_role(&self, name: &str, description: &str) -> DomainResult<()> {
        let existing = role::Entity::find()
            .filter(role::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        if existing.is_none() {
            let model = role::ActiveModel {
                id: NotSet,
                name: Set(name.to_string()),
                description: Set(Some(description.to_string())),
            };
            model.insert(&self.db).await.map_err(db_error_to_domain)?;
            info!("Role created: {}", name);
        }

        Ok(())
    }

    async fn assign_role(&self, user_id: &str, role_name: &str) -> DomainResult<()> {
        let role_model = role::Entity::find()
            .filter(role::Column::Name.eq(role_name))
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?
            .ok_or_else(|| DomainError::not_found("role", "name", role_name.to_string()))?;

        let existing = user_role::Entity::find_by_id((user_id.to_string(), role_model.id))
            .one(&self.db)
            .await
            .map_err(db_error_to_domain)?;

        if existing.is_none() {
            let link = user_role::ActiveModel {
                user_id: Set(user_id.to_string()),
                role_id: Set(role_model.id),
            };
            link.insert(&self.db).await.map_err(db_error_to_domain)?;
        }

        Ok(())
    }
}
