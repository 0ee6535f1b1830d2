//! Daily booking reminder

use std::collections::HashSet;

use tracing::info;

use crate::domain::DomainResult;
use crate::infrastructure::{Mailer, OutboundEmail, Storage};

/// Email every active non-admin account that has no open reservation.
/// Returns the number of reminders sent.
pub async fn send_booking_reminders(
    storage: &dyn Storage,
    mailer: &dyn Mailer,
) -> DomainResult<usize> {
    let users = storage.list_users().await?;
    let reservations = storage.list_all_reservations().await?;
    let with_active: HashSet<&str> = reservations
        .iter()
        .filter(|r| r.is_active())
        .map(|r| r.user_id.as_str())
        .collect();

    let mut sent = 0;
    for user in users {
        if user.is_admin() || !user.is_active || with_active.contains(user.id.as_str()) {
            continue;
        }

        let greeting = user.username.as_deref().unwrap_or(user.email.as_str());
        let email = OutboundEmail::new(
            user.email.clone(),
            "Your parking spot is waiting",
            format!(
                "<p>Hello {},</p>\
                 <p>You have no active parking reservation right now. \
                 Book a spot to secure your place.</p>",
                greeting
            ),
        );
        mailer.send(email).await?;
        sent += 1;
    }

    info!("Sent {} booking reminder(s)", sent);
    Ok(sent)
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParkingLot, User, ROLE_ADMIN};
    use crate::infrastructure::{InMemoryStorage, MemoryMailer};
    use chrono::Utc;

    async fn seed_user(storage: &InMemoryStorage, email: &str) -> User {
        let user = User::new(email, None, "hash");
        storage.save_user(user.clone()).await.unwrap();
        user
    }

    #[tokio::test]
    async fn reminds_only_idle_non_admin_accounts() {
        let storage = InMemoryStorage::new();
        let mailer = MemoryMailer::new();

        let mut admin = User::new("admin@lot.test", None, "hash");
        admin.roles.push(ROLE_ADMIN.to_string());
        storage.save_user(admin).await.unwrap();

        let parked = seed_user(&storage, "parked@lot.test").await;
        seed_user(&storage, "idle@lot.test").await;

        let mut disabled = User::new("disabled@lot.test", None, "hash");
        disabled.is_active = false;
        storage.save_user(disabled).await.unwrap();

        let lot = ParkingLot {
            id: 0,
            name: "Central".to_string(),
            address: "1 Main St".to_string(),
            pin_code: "12345".to_string(),
            price_per_hour: 10.0,
            capacity: 1,
            created_at: Utc::now(),
            updated_at: None,
        };
        let lot = storage.create_lot(lot, vec!["CEN-1".to_string()]).await.unwrap();
        storage
            .allocate_reservations(lot.id, &parked.id, 1, Utc::now())
            .await
            .unwrap();

        let sent = send_booking_reminders(&storage, &mailer).await.unwrap();

        assert_eq!(sent, 1);
        let mails = mailer.sent();
        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].to, "idle@lot.test");
        assert!(mails[0].body.contains("no active parking reservation"));
    }

    #[tokio::test]
    async fn released_reservation_makes_user_idle_again() {
        let storage = InMemoryStorage::new();
        let mailer = MemoryMailer::new();
        let user = seed_user(&storage, "driver@lot.test").await;

        let lot = ParkingLot {
            id: 0,
            name: "Central".to_string(),
            address: "1 Main St".to_string(),
            pin_code: "12345".to_string(),
            price_per_hour: 10.0,
            capacity: 1,
            created_at: Utc::now(),
            updated_at: None,
        };
        let lot = storage.create_lot(lot, vec!["CEN-1".to_string()]).await.unwrap();
        let res = storage
            .allocate_reservations(lot.id, &user.id, 1, Utc::now())
            .await
            .unwrap();
        storage
            .close_reservation(res[0].id, Utc::now(), 10.0)
            .await
            .unwrap();

        let sent = send_booking_reminders(&storage, &mailer).await.unwrap();
        assert_eq!(sent, 1);
    }
}
