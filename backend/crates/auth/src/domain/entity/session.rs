//! Session Entity
//!
//! Server-side record of one sign-in. The `active` flag is the single source
//! of truth for whether the credential bound to this session is honoured.

use chrono::{DateTime, Duration, Utc};
use kernel::id::{SessionId, UserId};

use crate::domain::value_object::UserRole;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: SessionId,
    pub user_id: UserId,
    /// Role at sign-in time
    pub role: UserRole,
    pub issued_at: DateTime<Utc>,
    /// Sliding freshness indicator; never extends `expires_at`
    pub last_activity_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
}

impl Session {
    /// New active session
    ///
    /// TTL is provided by the application layer (config), not hard-coded here.
    /// Returns `None` when the expiry is not representable.
    pub fn new(user_id: UserId, role: UserRole, ttl: Duration) -> Option<Self> {
        let now = Utc::now();
        Some(Self {
            session_id: SessionId::new(),
            user_id,
            role,
            issued_at: now,
            last_activity_at: now,
            expires_at: now.checked_add_signed(ttl)?,
            active: true,
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_active_and_fresh() {
        let session = Session::new(UserId::new(), UserRole::Driver, Duration::hours(1)).unwrap();

        assert!(session.active);
        assert_eq!(session.issued_at, session.last_activity_at);
        assert_eq!(session.expires_at - session.issued_at, Duration::hours(1));
        assert!(!session.is_expired_at(session.issued_at));
        assert!(session.is_expired_at(session.expires_at));
    }

    #[test]
    fn test_unrepresentable_expiry() {
        assert!(Session::new(UserId::new(), UserRole::Driver, Duration::days(100_000_000)).is_none());
    }
}
