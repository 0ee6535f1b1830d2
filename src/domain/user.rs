//! User and role domain entities

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Role granting access to the management endpoints
pub const ROLE_ADMIN: &str = "admin";
/// Default role for registered accounts
pub const ROLE_USER: &str = "user";

/// Registered account
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub password_hash: String,
    pub is_active: bool,
    /// Role names from the roles join table
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl User {
    /// A fresh account with the default role
    pub fn new(email: impl Into<String>, username: Option<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.into(),
            username,
            password_hash: password_hash.into(),
            is_active: true,
            roles: vec![ROLE_USER.to_string()],
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ROLE_ADMIN)
    }

    /// Role encoded into JWT claims
    pub fn primary_role(&self) -> &'static str {
        if self.is_admin() {
            ROLE_ADMIN
        } else {
            ROLE_USER
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_gets_default_role() {
        let user = User::new("a@b.c", None, "hash");
        assert_eq!(user.roles, vec![ROLE_USER.to_string()]);
        assert!(!user.is_admin());
        assert_eq!(user.primary_role(), ROLE_USER);
        assert!(user.is_active);
    }

    #[test]
    fn admin_role_wins_for_claims() {
        let mut user = User::new("a@b.c", None, "hash");
        user.roles.push(ROLE_ADMIN.to_string());
        assert!(user.is_admin());
        assert_eq!(user.primary_role(), ROLE_ADMIN);
    }

    #[test]
    fn ids_are_unique() {
        let a = User::new("a@b.c", None, "h");
        let b = User::new("b@b.c", None, "h");
        assert_ne!(a.id, b.id);
    }
}
