//! User Account Entity
//!
//! The sign-in view of a user: who they are, their role, and the stored
//! password hash (PHC string). Account management lives elsewhere.

use kernel::id::UserId;

use crate::domain::value_object::UserRole;

#[derive(Clone)]
pub struct UserAccount {
    pub user_id: UserId,
    /// Lower-cased, trimmed
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

impl UserAccount {
    pub fn normalize_email(raw: &str) -> String {
        raw.trim().to_lowercase()
    }
}

impl std::fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAccount")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}
