//! HTTP Handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::{SessionAuthority, SignInInput, SignInUseCase};
use crate::domain::entity::Identity;
use crate::domain::repository::{SessionRepository, UserRepository};
use crate::error::AuthResult;
use crate::presentation::dto::{LoginRequest, LoginResponse, MeResponse, UserSummary};
use crate::presentation::middleware::AuthGateState;

/// Shared state for auth handlers
pub struct AuthAppState<R>
where
    R: UserRepository + SessionRepository + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub authority: Arc<SessionAuthority<R>>,
}

impl<R> Clone for AuthAppState<R>
where
    R: UserRepository + SessionRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            authority: Arc::clone(&self.authority),
        }
    }
}

impl<R> AuthAppState<R>
where
    R: UserRepository + SessionRepository + Send + Sync + 'static,
{
    pub fn new(repo: R, config: &AuthConfig) -> AuthResult<Self> {
        let repo = Arc::new(repo);
        let authority = Arc::new(SessionAuthority::new(Arc::clone(&repo), config)?);
        Ok(Self { repo, authority })
    }

    /// Gate state for protecting other routers with the same authority
    pub fn gate(&self) -> AuthGateState<R> {
        AuthGateState {
            authority: Arc::clone(&self.authority),
        }
    }
}

// ============================================================================
// Login
// ============================================================================

/// POST /api/auth/login
pub async fn login<R>(
    State(state): State<AuthAppState<R>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AuthResult<Json<LoginResponse>>
where
    R: UserRepository + SessionRepository + Send + Sync + 'static,
{
    let Json(req) = payload?;
    let use_case = SignInUseCase::new(state.repo.clone(), state.authority.clone());

    let (account, issued) = use_case
        .execute(SignInInput {
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: issued.session.expires_at,
        user: UserSummary {
            user_id: account.user_id,
            email: account.email,
            role: account.role,
        },
    }))
}

// ============================================================================
// Logout (behind the gate)
// ============================================================================

/// POST /api/auth/logout
pub async fn logout<R>(
    State(state): State<AuthAppState<R>>,
    identity: Identity,
) -> AuthResult<StatusCode>
where
    R: UserRepository + SessionRepository + Send + Sync + 'static,
{
    state.authority.revoke(&identity).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Me (behind the gate)
// ============================================================================

/// GET /api/auth/me
pub async fn me(identity: Identity) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: identity.user_id,
        role: identity.role,
        session_id: identity.session_id,
    })
}
