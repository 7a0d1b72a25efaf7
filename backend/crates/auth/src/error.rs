//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use datastore::{ErrorClass, StoreError};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::bearer::BearerError;
use platform::password::PasswordHashError;
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Machine-readable rejection reasons carried in 401 bodies
pub mod reason {
    pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
    pub const SESSION_INVALIDATED: &str = "SESSION_INVALIDATED";
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
}

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer credential on the request
    #[error("Authentication required")]
    MissingToken,

    /// Malformed credential or bad signature
    #[error("Invalid token")]
    InvalidToken,

    /// Credential past its expiry
    #[error("Token expired")]
    TokenExpired,

    /// Credential is sound but its session was superseded or signed out
    #[error("Session is no longer active")]
    SessionInvalidated,

    /// Authenticated, but the role is not allowed here
    #[error("Insufficient permissions")]
    Forbidden,

    /// Wrong email or password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Invalid auth configuration (fatal at startup)
    #[error("Invalid auth configuration: {0}")]
    Config(String),

    /// Request body could not be read
    #[error(transparent)]
    Request(AppError),

    /// Store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::SessionInvalidated
            | AuthError::InvalidCredentials => ErrorKind::Unauthorized,
            AuthError::Forbidden => ErrorKind::Forbidden,
            AuthError::Request(app) => app.kind(),
            AuthError::Store(err) if is_unavailable(err) => ErrorKind::ServiceUnavailable,
            AuthError::Store(_) | AuthError::Config(_) | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Rejection reason for 401 bodies
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            AuthError::InvalidToken => Some(reason::INVALID_TOKEN),
            AuthError::TokenExpired => Some(reason::TOKEN_EXPIRED),
            AuthError::SessionInvalidated => Some(reason::SESSION_INVALIDATED),
            _ => None,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Convert to AppError
    pub fn into_app_error(self) -> AppError {
        if let AuthError::Request(app) = self {
            return app;
        }
        let mut app = AppError::new(self.kind(), self.to_string());
        if let Some(reason) = self.reason() {
            app = app.with_reason(reason);
        }
        match self {
            AuthError::Store(err) => app.with_source(err),
            _ => app,
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Store(e) => {
                tracing::error!(
                    error = %e,
                    source = ?std::error::Error::source(e).map(|s| s.to_string()),
                    "Auth store error"
                );
            }
            AuthError::Internal(msg) | AuthError::Config(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::InvalidToken => {
                tracing::warn!("Rejected credential with invalid signature or shape");
            }
            _ => {
                tracing::debug!(error = %self, "Auth rejection");
            }
        }
    }
}

/// Store failures the caller may retry later
fn is_unavailable(err: &StoreError) -> bool {
    matches!(err.class(), ErrorClass::Transient | ErrorClass::Unavailable)
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.into_app_error().into_response()
    }
}

impl From<BearerError> for AuthError {
    fn from(err: BearerError) -> Self {
        match err {
            BearerError::Missing => AuthError::MissingToken,
            BearerError::Malformed => AuthError::InvalidToken,
        }
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::Request(AppError::from(rejection))
    }
}

impl From<PasswordHashError> for AuthError {
    fn from(err: PasswordHashError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_rejections_are_401_with_distinct_reasons() {
        let cases = [
            (AuthError::MissingToken, None),
            (AuthError::InvalidToken, Some("INVALID_TOKEN")),
            (AuthError::TokenExpired, Some("TOKEN_EXPIRED")),
            (AuthError::SessionInvalidated, Some("SESSION_INVALIDATED")),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_code(), 401);
            assert_eq!(err.reason(), expected);
        }
    }

    #[test]
    fn test_forbidden_has_no_reason() {
        let app = AuthError::Forbidden.into_app_error();
        assert_eq!(app.status_code(), 403);
        assert_eq!(app.reason(), None);
    }

    #[test]
    fn test_store_errors_map_to_503_or_500() {
        let transient = AuthError::from(StoreError::transient(std::io::Error::other("reset")));
        assert_eq!(transient.status_code(), 503);
        assert_eq!(AuthError::from(StoreError::Unavailable).status_code(), 503);
        assert_eq!(AuthError::from(StoreError::Draining).status_code(), 503);

        let rejected = AuthError::from(StoreError::rejected(std::io::Error::other("23505")));
        assert_eq!(rejected.status_code(), 500);
    }

    #[test]
    fn test_server_errors_do_not_leak_detail() {
        let app = AuthError::from(StoreError::fault(std::io::Error::other(
            "password authentication failed for user transit_app",
        )))
        .into_app_error();

        assert_eq!(app.public_message(), "Internal server error");
        assert!(!app.body().message.contains("transit_app"));
    }

    #[test]
    fn test_bearer_error_mapping() {
        assert!(matches!(
            AuthError::from(BearerError::Missing),
            AuthError::MissingToken
        ));
        assert!(matches!(
            AuthError::from(BearerError::Malformed),
            AuthError::InvalidToken
        ));
    }
}
