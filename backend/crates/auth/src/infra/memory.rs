//! In-memory repository
//!
//! Single-process stand-in for the PostgreSQL repository. One mutex guards
//! all sessions, which makes supersede-and-insert atomic.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::{SessionId, UserId};
use tokio::sync::Mutex;

use crate::domain::entity::{Session, UserAccount};
use crate::domain::repository::{SessionRepository, UserRepository};
use crate::error::AuthResult;

#[derive(Clone, Default)]
pub struct InMemoryAuthRepository {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
    users: Arc<Mutex<HashMap<String, UserAccount>>>,
}

impl InMemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account (keyed by normalized email)
    pub async fn insert_user(&self, mut account: UserAccount) {
        account.email = UserAccount::normalize_email(&account.email);
        self.users.lock().await.insert(account.email.clone(), account);
    }

    /// Number of active sessions held for `user_id`
    pub async fn active_session_count(&self, user_id: UserId) -> usize {
        self.sessions
            .lock()
            .await
            .values()
            .filter(|s| s.user_id == user_id && s.active)
            .count()
    }
}

impl SessionRepository for InMemoryAuthRepository {
    async fn create_superseding(&self, session: &Session) -> AuthResult<u64> {
        let mut sessions = self.sessions.lock().await;

        let mut superseded = 0;
        for existing in sessions.values_mut() {
            if existing.user_id == session.user_id && existing.active {
                existing.active = false;
                superseded += 1;
            }
        }
        sessions.insert(session.session_id, session.clone());

        Ok(superseded)
    }

    async fn find_by_id(&self, session_id: SessionId) -> AuthResult<Option<Session>> {
        Ok(self.sessions.lock().await.get(&session_id).cloned())
    }

    async fn touch(&self, session_id: SessionId, at: DateTime<Utc>) -> AuthResult<()> {
        if let Some(session) = self.sessions.lock().await.get_mut(&session_id) {
            if session.active {
                session.last_activity_at = at;
            }
        }
        Ok(())
    }

    async fn deactivate(&self, session_id: SessionId) -> AuthResult<bool> {
        let mut sessions = self.sessions.lock().await;
        Ok(match sessions.get_mut(&session_id) {
            Some(session) if session.active => {
                session.active = false;
                true
            }
            _ => false,
        })
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        let deleted = (before - sessions.len()) as u64;

        tracing::info!(sessions_deleted = deleted, "Cleaned up expired sessions");

        Ok(deleted)
    }
}

impl UserRepository for InMemoryAuthRepository {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserAccount>> {
        Ok(self.users.lock().await.get(email).cloned())
    }
}
