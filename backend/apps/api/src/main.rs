//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod routes;

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use auth::{AuthAppState, AuthConfig, PgAuthRepository};
use axum::http::{self, Method, header};
use datastore::{ConnectionSupervisor, PgConnector, QueryFacade, StoreConfig, StoreError};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "transit_api=info,auth=info,datastore=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration errors are fatal before anything binds
    let store_config = StoreConfig::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "Invalid store configuration");
    })?;
    let auth_config = AuthConfig::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "Invalid auth configuration");
    })?;

    // Store connectivity
    let supervisor = Arc::new(ConnectionSupervisor::new(PgConnector, store_config));
    let status = supervisor.initialize().await?;
    if status.is_ready() {
        tracing::info!(status = status.as_str(), "Store ready");
    } else {
        tracing::error!(
            status = status.as_str(),
            "Store unavailable; serving in degraded mode"
        );
    }

    let facade = QueryFacade::new(Arc::clone(&supervisor));

    // Run migrations
    let migrated = facade
        .execute(|pool| async move {
            sqlx::migrate!("../../../database/migrations")
                .run(&pool)
                .await?;
            Ok::<_, StoreError>(())
        })
        .await;
    match migrated {
        Ok(()) => tracing::info!("Migrations completed"),
        Err(e) if status.is_ready() => return Err(e.into()),
        Err(e) => tracing::warn!(error = %e, "Migrations skipped while degraded"),
    }

    let auth_state = AuthAppState::new(PgAuthRepository::new(facade.clone()), &auth_config)?;

    // Startup cleanup: remove expired sessions
    // Errors here should not prevent server startup
    if let Err(e) = auth_state.authority.cleanup_expired().await {
        tracing::warn!(
            error = %e,
            "Auth session cleanup failed, continuing anyway"
        );
    }

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]));

    // Build router
    let app = routes::app_router(facade, auth_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env::var("API_BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:31113".to_string())
        .parse()?;
    tracing::info!(%addr, "Listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Release the store only after in-flight requests finished
    tracing::info!("Server stopped, releasing store");
    supervisor.shutdown().await.inspect_err(|e| {
        tracing::error!(error = %e, "Store release failed");
    })?;

    tracing::info!("Shut down gracefully");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
