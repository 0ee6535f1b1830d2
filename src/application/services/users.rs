//! Account registration, login and profile service

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::auth::{hash_password, verify_password};
use crate::domain::{DomainError, DomainResult, User, ROLE_ADMIN, ROLE_USER};
use crate::infrastructure::Storage;

/// Partial profile update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
}

/// Service for accounts and credentials
pub struct UserService {
    storage: Arc<dyn Storage>,
}

impl UserService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Create the built-in roles and the configured admin account.
    /// Safe to run on every startup.
    pub async fn bootstrap(&self, admin_email: &str, admin_password: &str) -> DomainResult<()> {
        self.storage
            .ensure_role(ROLE_ADMIN, "full management access")
            .await?;
        self.storage.ensure_role(ROLE_USER, "regular account").await?;

        if self.storage.get_user_by_email(admin_email).await?.is_none() {
            let hash = hash_password(admin_password).map_err(hash_error)?;
            let mut admin = User::new(admin_email, Some("admin".to_string()), hash);
            admin.roles = vec![ROLE_ADMIN.to_string(), ROLE_USER.to_string()];
            self.storage.save_user(admin).await?;
            info!("Admin account created: {}", admin_email);
        }

        Ok(())
    }

    pub async fn register(
        &self,
        email: &str,
        username: Option<String>,
        password: &str,
    ) -> DomainResult<User> {
        let email = email.trim().to_lowercase();
        if self.storage.get_user_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict(format!("user '{}'", email)));
        }

        let hash = hash_password(password).map_err(hash_error)?;
        let user = User::new(email, username, hash);
        self.storage.save_user(user.clone()).await?;

        info!("User registered: {}", user.email);
        Ok(user)
    }

    /// Verify the credentials and stamp the login time.
    pub async fn authenticate(&self, email: &str, password: &str) -> DomainResult<User> {
        let email = email.trim().to_lowercase();
        let mut user = self
            .storage
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| DomainError::Unauthorized("invalid credentials".into()))?;

        if !verify_password(password, &user.password_hash).map_err(hash_error)? {
            return Err(DomainError::Unauthorized("invalid credentials".into()));
        }
        if !user.is_active {
            return Err(DomainError::Unauthorized("account is disabled".into()));
        }

        user.last_login_at = Some(Utc::now());
        user.updated_at = Utc::now();
        self.storage.update_user(user.clone()).await?;
        Ok(user)
    }

    pub async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> DomainResult<User> {
        let mut user = self
            .storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", "id", user_id.to_string()))?;

        if let Some(email) = update.email {
            let email = email.trim().to_lowercase();
            if email != user.email {
                if self.storage.get_user_by_email(&email).await?.is_some() {
                    return Err(DomainError::Conflict(format!("user '{}'", email)));
                }
                user.email = email;
            }
        }
        if let Some(username) = update.username {
            user.username = if username.is_empty() { None } else { Some(username) };
        }

        user.updated_at = Utc::now();
        self.storage.update_user(user.clone()).await?;
        Ok(user)
    }

    /// Replace the password after checking the current one.
    pub async fn change_password(
        &self,
        user_id: &str,
        current: &str,
        new_password: &str,
    ) -> DomainResult<()> {
        let mut user = self
            .storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", "id", user_id.to_string()))?;

        if !verify_password(current, &user.password_hash).map_err(hash_error)? {
            return Err(DomainError::Unauthorized(
                "current password is incorrect".into(),
            ));
        }

        user.password_hash = hash_password(new_password).map_err(hash_error)?;
        user.updated_at = Utc::now();
        self.storage.update_user(user).await?;
        Ok(())
    }
}

fn hash_error(e: bcrypt::BcryptError) -> DomainError {
    DomainError::Storage(format!("password hashing failed: {}", e))
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::InMemoryStorage;

    fn service() -> (UserService, Arc<InMemoryStorage>) {
        let storage = Arc::new(InMemoryStorage::new());
        (UserService::new(storage.clone()), storage)
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let (service, storage) = service();
        service.bootstrap("admin@lot.test", "secret").await.unwrap();
        service.bootstrap("admin@lot.test", "secret").await.unwrap();

        let users = storage.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].is_admin());
    }

    #[tokio::test]
    async fn register_normalizes_email_and_rejects_duplicates() {
        let (service, _) = service();
        let user = service
            .register("  Driver@Lot.TEST ", None, "pw123456")
            .await
            .unwrap();
        assert_eq!(user.email, "driver@lot.test");
        assert!(!user.is_admin());

        let err = service
            .register("driver@lot.test", None, "pw123456")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn authenticate_checks_password_and_stamps_login() {
        let (service, storage) = service();
        service.register("driver@lot.test", None, "pw123456").await.unwrap();

        let err = service.authenticate("driver@lot.test", "wrong").await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));

        let user = service.authenticate("driver@lot.test", "pw123456").await.unwrap();
        assert!(user.last_login_at.is_some());
        let stored = storage.get_user(&user.id).await.unwrap().unwrap();
        assert!(stored.last_login_at.is_some());
    }

    #[tokio::test]
    async fn inactive_accounts_cannot_log_in() {
        let (service, storage) = service();
        let user = service.register("driver@lot.test", None, "pw123456").await.unwrap();

        let mut stored = storage.get_user(&user.id).await.unwrap().unwrap();
        stored.is_active = false;
        storage.update_user(stored).await.unwrap();

        let err = service.authenticate("driver@lot.test", "pw123456").await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn change_password_requires_the_current_one() {
        let (service, _) = service();
        let user = service.register("driver@lot.test", None, "pw123456").await.unwrap();

        let err = service
            .change_password(&user.id, "wrong", "newpw1234")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));

        service
            .change_password(&user.id, "pw123456", "newpw1234")
            .await
            .unwrap();
        assert!(service.authenticate("driver@lot.test", "newpw1234").await.is_ok());
    }

    #[tokio::test]
    async fn profile_update_rejects_taken_email() {
        let (service, _) = service();
        service.register("first@lot.test", None, "pw123456").await.unwrap();
        let second = service.register("second@lot.test", None, "pw123456").await.unwrap();

        let err = service
            .update_profile(
                &second.id,
                ProfileUpdate {
                    email: Some("first@lot.test".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let updated = service
            .update_profile(
                &second.id,
                ProfileUpdate {
                    username: Some("driver two".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username.as_deref(), Some("driver two"));
    }
}
