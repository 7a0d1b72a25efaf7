//! Auth Router

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::domain::repository::{SessionRepository, UserRepository};
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::require_identity;

/// Create the Auth router for any repository implementation
///
/// `/login` is public; `/logout` and `/me` sit behind the gate.
pub fn auth_router<R>(state: AuthAppState<R>) -> Router
where
    R: UserRepository + SessionRepository + Send + Sync + 'static,
{
    let protected = Router::new()
        .route("/logout", post(handlers::logout::<R>))
        .route("/me", get(handlers::me))
        .route_layer(from_fn_with_state(state.gate(), require_identity::<R>));

    Router::new()
        .route("/login", post(handlers::login::<R>))
        .merge(protected)
        .with_state(state)
}
