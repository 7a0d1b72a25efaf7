//! Auth Gate
//!
//! `require_identity` authenticates the bearer credential and attaches an
//! [`Identity`] to the request. `require_roles` must be layered inside it.

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::Request;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use platform::bearer::extract_bearer;
use std::sync::Arc;

use crate::application::SessionAuthority;
use crate::domain::entity::Identity;
use crate::domain::repository::SessionRepository;
use crate::domain::value_object::UserRole;
use crate::error::{AuthError, AuthResult};

/// Middleware state
pub struct AuthGateState<R>
where
    R: SessionRepository + Send + Sync + 'static,
{
    pub authority: Arc<SessionAuthority<R>>,
}

impl<R> Clone for AuthGateState<R>
where
    R: SessionRepository + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            authority: Arc::clone(&self.authority),
        }
    }
}

/// Middleware that requires a valid credential
///
/// ```ignore
/// router.route_layer(axum::middleware::from_fn_with_state(gate, require_identity::<R>))
/// ```
pub async fn require_identity<R>(
    State(state): State<AuthGateState<R>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError>
where
    R: SessionRepository + Send + Sync + 'static,
{
    let token = extract_bearer(req.headers())?.to_owned();
    let identity = state.authority.validate(&token).await?;

    tracing::debug!(
        user_id = %identity.user_id,
        role = %identity.role,
        "Request authenticated"
    );

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Role-membership check; a pure predicate
pub fn authorize(identity: &Identity, allowed: &[UserRole]) -> AuthResult<()> {
    if allowed.contains(&identity.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// Middleware that rejects identities whose role is not in `allowed` with 403
///
/// ```ignore
/// const STAFF: &[UserRole] = &[UserRole::Operator, UserRole::Admin];
/// router
///     .route_layer(axum::middleware::from_fn_with_state(STAFF, require_roles))
///     .route_layer(axum::middleware::from_fn_with_state(gate, require_identity::<R>))
/// ```
pub async fn require_roles(
    State(allowed): State<&'static [UserRole]>,
    identity: Identity,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    if let Err(err) = authorize(&identity, allowed) {
        tracing::warn!(
            user_id = %identity.user_id,
            role = %identity.role,
            "Role not permitted"
        );
        return Err(err);
    }
    Ok(next.run(req).await)
}

/// Extracts the identity attached by [`require_identity`]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel::id::{SessionId, UserId};

    fn identity(role: UserRole) -> Identity {
        Identity {
            user_id: UserId::new(),
            role,
            session_id: SessionId::new(),
        }
    }

    #[test]
    fn test_authorize() {
        let staff = [UserRole::Operator, UserRole::Admin];

        assert!(authorize(&identity(UserRole::Admin), &staff).is_ok());
        assert!(matches!(
            authorize(&identity(UserRole::Passenger), &staff),
            Err(AuthError::Forbidden)
        ));
        assert!(authorize(&identity(UserRole::Driver), &[]).is_err());
    }
}
