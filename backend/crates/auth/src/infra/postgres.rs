//! PostgreSQL Repository Implementations
//!
//! Every statement goes through the query facade, so it runs on whichever
//! pool is active and transient failures are retried there.

use chrono::{DateTime, Utc};
use datastore::{PgQueryFacade, StoreError};
use kernel::id::{SessionId, UserId};
use uuid::Uuid;

use crate::domain::entity::{Session, UserAccount};
use crate::domain::repository::{SessionRepository, UserRepository};
use crate::domain::value_object::UserRole;
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed auth repository
#[derive(Clone)]
pub struct PgAuthRepository {
    facade: PgQueryFacade,
}

impl PgAuthRepository {
    pub fn new(facade: PgQueryFacade) -> Self {
        Self { facade }
    }
}

// ============================================================================
// Session Repository Implementation
// ============================================================================

impl SessionRepository for PgAuthRepository {
    async fn create_superseding(&self, session: &Session) -> AuthResult<u64> {
        let row = SessionRow::from(session);

        let superseded = self
            .facade
            .execute(|pool| {
                let row = row.clone();
                async move {
                    let mut tx = pool.begin().await?;

                    // Serializes concurrent sign-ins of the same user
                    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
                        .bind(row.user_id)
                        .execute(&mut *tx)
                        .await?;

                    let superseded = sqlx::query(
                        "UPDATE sessions SET active = FALSE WHERE user_id = $1 AND active",
                    )
                    .bind(row.user_id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();

                    sqlx::query(
                        r#"
                        INSERT INTO sessions (
                            session_id,
                            user_id,
                            role,
                            issued_at,
                            last_activity_at,
                            expires_at,
                            active
                        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                        "#,
                    )
                    .bind(row.session_id)
                    .bind(row.user_id)
                    .bind(row.role)
                    .bind(row.issued_at)
                    .bind(row.last_activity_at)
                    .bind(row.expires_at)
                    .bind(row.active)
                    .execute(&mut *tx)
                    .await?;

                    tx.commit().await?;
                    Ok::<_, StoreError>(superseded)
                }
            })
            .await?;

        Ok(superseded)
    }

    async fn find_by_id(&self, session_id: SessionId) -> AuthResult<Option<Session>> {
        let session_id = session_id.into_uuid();

        let row = self
            .facade
            .execute(|pool| async move {
                let row = sqlx::query_as::<_, SessionRow>(
                    r#"
                    SELECT
                        session_id,
                        user_id,
                        role,
                        issued_at,
                        last_activity_at,
                        expires_at,
                        active
                    FROM sessions
                    WHERE session_id = $1
                    "#,
                )
                .bind(session_id)
                .fetch_optional(&pool)
                .await?;
                Ok::<_, StoreError>(row)
            })
            .await?;

        row.map(SessionRow::into_session).transpose()
    }

    async fn touch(&self, session_id: SessionId, at: DateTime<Utc>) -> AuthResult<()> {
        let session_id = session_id.into_uuid();

        self.facade
            .execute(|pool| async move {
                sqlx::query(
                    "UPDATE sessions SET last_activity_at = $2 WHERE session_id = $1 AND active",
                )
                .bind(session_id)
                .bind(at)
                .execute(&pool)
                .await?;
                Ok::<_, StoreError>(())
            })
            .await?;

        Ok(())
    }

    async fn deactivate(&self, session_id: SessionId) -> AuthResult<bool> {
        let session_id = session_id.into_uuid();

        let updated = self
            .facade
            .execute(|pool| async move {
                let result = sqlx::query(
                    "UPDATE sessions SET active = FALSE WHERE session_id = $1 AND active",
                )
                .bind(session_id)
                .execute(&pool)
                .await?;
                Ok::<_, StoreError>(result.rows_affected())
            })
            .await?;

        Ok(updated > 0)
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let deleted = self
            .facade
            .execute(|pool| async move {
                let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
                    .bind(now)
                    .execute(&pool)
                    .await?;
                Ok::<_, StoreError>(result.rows_affected())
            })
            .await?;

        tracing::info!(sessions_deleted = deleted, "Cleaned up expired sessions");

        Ok(deleted)
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgAuthRepository {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserAccount>> {
        let email = email.to_owned();

        let row = self
            .facade
            .execute(|pool| {
                let email = email.clone();
                async move {
                    let row = sqlx::query_as::<_, UserAccountRow>(
                        r#"
                        SELECT user_id, email, password_hash, role
                        FROM users
                        WHERE email = $1
                        "#,
                    )
                    .bind(email)
                    .fetch_optional(&pool)
                    .await?;
                    Ok::<_, StoreError>(row)
                }
            })
            .await?;

        row.map(UserAccountRow::into_account).transpose()
    }
}

// ============================================================================
// Database Row Types
// ============================================================================

#[derive(Clone, sqlx::FromRow)]
struct SessionRow {
    session_id: Uuid,
    user_id: Uuid,
    role: i16,
    issued_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    active: bool,
}

impl From<&Session> for SessionRow {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.session_id.into_uuid(),
            user_id: session.user_id.into_uuid(),
            role: session.role.id(),
            issued_at: session.issued_at,
            last_activity_at: session.last_activity_at,
            expires_at: session.expires_at,
            active: session.active,
        }
    }
}

impl SessionRow {
    fn into_session(self) -> AuthResult<Session> {
        Ok(Session {
            session_id: SessionId::from_uuid(self.session_id),
            user_id: UserId::from_uuid(self.user_id),
            role: decode_role(self.role)?,
            issued_at: self.issued_at,
            last_activity_at: self.last_activity_at,
            expires_at: self.expires_at,
            active: self.active,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserAccountRow {
    user_id: Uuid,
    email: String,
    password_hash: String,
    role: i16,
}

impl UserAccountRow {
    fn into_account(self) -> AuthResult<UserAccount> {
        Ok(UserAccount {
            user_id: UserId::from_uuid(self.user_id),
            email: self.email,
            password_hash: self.password_hash,
            role: decode_role(self.role)?,
        })
    }
}

fn decode_role(id: i16) -> AuthResult<UserRole> {
    UserRole::from_id(id).ok_or_else(|| AuthError::Internal(format!("Invalid role id: {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;
    use datastore::{ConnectionSupervisor, PgConnector, QueryFacade, StoreConfig};

    /// Repository on the store named by the `DB_*` variables
    ///
    /// Expects the schema under `database/migrations` to be applied.
    async fn connect() -> PgAuthRepository {
        let config = StoreConfig::from_env().unwrap();
        let supervisor = Arc::new(ConnectionSupervisor::new(PgConnector, config));
        let status = supervisor.initialize().await.unwrap();
        assert!(status.is_ready(), "store is {}", status.as_str());
        PgAuthRepository::new(QueryFacade::new(supervisor))
    }

    async fn insert_user(repo: &PgAuthRepository) -> UserId {
        let user_id = UserId::new();
        let uuid = user_id.into_uuid();
        repo.facade
            .execute(|pool| async move {
                sqlx::query(
                    "INSERT INTO users (user_id, email, password_hash, role) VALUES ($1, $2, 'x', 0)",
                )
                .bind(uuid)
                .bind(format!("{uuid}@test.invalid"))
                .execute(&pool)
                .await?;
                Ok::<_, StoreError>(())
            })
            .await
            .unwrap();
        user_id
    }

    async fn active_sessions(repo: &PgAuthRepository, user_id: UserId) -> i64 {
        let uuid = user_id.into_uuid();
        repo.facade
            .execute(|pool| async move {
                let count: i64 = sqlx::query_scalar(
                    "SELECT count(*) FROM sessions WHERE user_id = $1 AND active",
                )
                .bind(uuid)
                .fetch_one(&pool)
                .await?;
                Ok::<_, StoreError>(count)
            })
            .await
            .unwrap()
    }

    async fn delete_user(repo: &PgAuthRepository, user_id: UserId) {
        let uuid = user_id.into_uuid();
        repo.facade
            .execute(|pool| async move {
                sqlx::query("DELETE FROM users WHERE user_id = $1")
                    .bind(uuid)
                    .execute(&pool)
                    .await?;
                Ok::<_, StoreError>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_concurrent_create_superseding_keeps_one_active_session() {
        let repo = connect().await;
        let user_id = insert_user(&repo).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    let session =
                        Session::new(user_id, UserRole::Passenger, Duration::hours(1)).unwrap();
                    repo.create_superseding(&session).await.map(|_| session.session_id)
                })
            })
            .collect();

        let mut issued = Vec::new();
        for handle in handles {
            issued.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(active_sessions(&repo, user_id).await, 1);

        let mut still_active = 0;
        for session_id in issued {
            let session = repo.find_by_id(session_id).await.unwrap().unwrap();
            if session.active {
                still_active += 1;
            }
        }
        assert_eq!(still_active, 1);

        delete_user(&repo, user_id).await;
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_create_superseding_reports_replaced_sessions() {
        let repo = connect().await;
        let user_id = insert_user(&repo).await;

        let first = Session::new(user_id, UserRole::Passenger, Duration::hours(1)).unwrap();
        let second = Session::new(user_id, UserRole::Passenger, Duration::hours(1)).unwrap();

        assert_eq!(repo.create_superseding(&first).await.unwrap(), 0);
        assert_eq!(repo.create_superseding(&second).await.unwrap(), 1);

        let first = repo.find_by_id(first.session_id).await.unwrap().unwrap();
        assert!(!first.active);
        assert_eq!(active_sessions(&repo, user_id).await, 1);

        delete_user(&repo, user_id).await;
    }
}
