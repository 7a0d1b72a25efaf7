//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use chrono::{DateTime, Utc};
use kernel::id::SessionId;

use crate::domain::entity::{Session, UserAccount};
use crate::error::AuthResult;

/// Session repository trait
#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    /// Insert `session` and deactivate every other active session of the same
    /// user, as one atomic step. Returns how many sessions were superseded.
    ///
    /// No observer may ever see two active sessions for one user.
    async fn create_superseding(&self, session: &Session) -> AuthResult<u64>;

    /// Find session by ID (active or not)
    async fn find_by_id(&self, session_id: SessionId) -> AuthResult<Option<Session>>;

    /// Update last activity of an active session
    async fn touch(&self, session_id: SessionId, at: DateTime<Utc>) -> AuthResult<()>;

    /// Flip the active flag off. Returns false if it was already inactive or missing.
    async fn deactivate(&self, session_id: SessionId) -> AuthResult<bool>;

    /// Delete sessions whose expiry is at or before `now`
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}

/// User lookup for sign-in
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Find user by normalized email
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserAccount>>;
}
