//! Session Authority
//!
//! Issues credentials bound to a session record and decides whether a
//! presented credential is still honoured. At most one session per user is
//! active; issuing a new one supersedes the previous one atomically.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::UserId;

use crate::application::config::AuthConfig;
use crate::application::credential::{Claims, CredentialSigner};
use crate::domain::entity::{Identity, Session};
use crate::domain::repository::SessionRepository;
use crate::domain::value_object::UserRole;
use crate::error::{AuthError, AuthResult};

/// A freshly issued credential and the session it is bound to
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub token: String,
    pub session: Session,
}

pub struct SessionAuthority<R>
where
    R: SessionRepository + Send + Sync + 'static,
{
    repo: Arc<R>,
    signer: CredentialSigner,
    ttl: chrono::Duration,
}

impl<R> SessionAuthority<R>
where
    R: SessionRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, config: &AuthConfig) -> AuthResult<Self> {
        let ttl = config.session_ttl()?;

        Ok(Self {
            repo,
            signer: CredentialSigner::new(&config.token_secret),
            ttl,
        })
    }

    /// Create an active session for `user_id`, superseding any prior one,
    /// and sign a credential for it
    pub async fn issue(&self, user_id: UserId, role: UserRole) -> AuthResult<IssuedCredential> {
        let session = Session::new(user_id, role, self.ttl)
            .ok_or_else(|| AuthError::Internal("Session expiry out of range".to_string()))?;
        let superseded = self.repo.create_superseding(&session).await?;

        if superseded > 0 {
            tracing::info!(
                user_id = %user_id,
                superseded,
                "Prior session superseded by new sign-in"
            );
        }

        let token = self.signer.sign(&Claims::for_session(&session))?;

        Ok(IssuedCredential { token, session })
    }

    /// Resolve a credential to the caller's identity
    ///
    /// Order: signature, expiry, session lookup, activity refresh. A missing
    /// session counts as invalidated (superseded and later cleaned up).
    pub async fn validate(&self, token: &str) -> AuthResult<Identity> {
        let claims = self.signer.verify(token)?;

        let session = self
            .repo
            .find_by_id(claims.sid)
            .await?
            .ok_or(AuthError::SessionInvalidated)?;

        if !session.active || session.user_id != claims.sub {
            return Err(AuthError::SessionInvalidated);
        }

        if let Err(e) = self.repo.touch(session.session_id, Utc::now()).await {
            tracing::warn!(
                session_id = %session.session_id,
                error = %e,
                "Failed to update session activity"
            );
        }

        Ok(Identity {
            user_id: claims.sub,
            role: claims.role,
            session_id: claims.sid,
        })
    }

    /// Sign out: deactivate the caller's session
    pub async fn revoke(&self, identity: &Identity) -> AuthResult<()> {
        let deactivated = self.repo.deactivate(identity.session_id).await?;
        tracing::info!(
            user_id = %identity.user_id,
            session_id = %identity.session_id,
            deactivated,
            "Session revoked"
        );
        Ok(())
    }

    /// Delete sessions past their expiry
    pub async fn cleanup_expired(&self) -> AuthResult<u64> {
        self.repo.cleanup_expired(Utc::now()).await
    }
}
