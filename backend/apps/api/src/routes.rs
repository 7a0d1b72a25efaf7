//! Application router
//!
//! Health reporting and the operator failover trigger live here; everything
//! under `/api/auth` comes from the auth crate.

use auth::{AuthAppState, PgAuthRepository, UserRole, auth_router, require_identity, require_roles};
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Json, Router};
use datastore::{PgQueryFacade, StoreError, SupervisorStatus};
use kernel::error::app_error::{AppError, AppResult};
use serde::Serialize;

/// Roles allowed to drive the store by hand
const STORE_OPERATORS: &[UserRole] = &[UserRole::Operator, UserRole::Admin];

#[derive(Clone)]
pub struct ApiState {
    pub facade: PgQueryFacade,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatusResponse {
    pub status: &'static str,
    pub ready: bool,
    /// Role of the active target, if any
    pub target: Option<&'static str>,
}

impl From<SupervisorStatus> for StoreStatusResponse {
    fn from(status: SupervisorStatus) -> Self {
        let target = match status {
            SupervisorStatus::Ready(role) => Some(role.as_str()),
            _ => None,
        };
        Self {
            status: status.as_str(),
            ready: status.is_ready(),
            target,
        }
    }
}

pub fn app_router(facade: PgQueryFacade, auth_state: AuthAppState<PgAuthRepository>) -> Router {
    let api_state = ApiState { facade };

    let admin = Router::new()
        .route("/store/failover", post(failover))
        .route_layer(from_fn_with_state(STORE_OPERATORS, require_roles))
        .route_layer(from_fn_with_state(
            auth_state.gate(),
            require_identity::<PgAuthRepository>,
        ))
        .with_state(api_state.clone());

    Router::new()
        .route("/api/health", get(health))
        .with_state(api_state)
        .nest("/api/auth", auth_router(auth_state))
        .nest("/api/admin", admin)
}

/// GET /api/health
async fn health(State(state): State<ApiState>) -> (StatusCode, Json<StoreStatusResponse>) {
    let status = state.facade.status().await;
    let code = if status.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status.into()))
}

/// POST /api/admin/store/failover
async fn failover(State(state): State<ApiState>) -> AppResult<Json<StoreStatusResponse>> {
    tracing::warn!("Operator requested store failover");

    let status = state
        .facade
        .supervisor()
        .failover()
        .await
        .map_err(store_error)?;

    Ok(Json(status.into()))
}

fn store_error(err: StoreError) -> AppError {
    match err {
        StoreError::Unavailable => {
            AppError::service_unavailable("No fallback store available").with_source(err)
        }
        StoreError::Draining => AppError::service_unavailable("Shutting down").with_source(err),
        other => AppError::internal(other.to_string()).with_source(other),
    }
}
