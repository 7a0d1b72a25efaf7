//! Store Error Types
//!
//! Failure taxonomy for everything that talks to the relational store.
//! The classification decides retry behaviour: only [`ErrorClass::Transient`]
//! failures are ever retried.

use std::time::Duration;

use thiserror::Error;

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed error source
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// How a failure should be treated by callers and retry policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Likely to succeed if repeated (reset, timeout, admin termination)
    Transient,
    /// The store refused the operation itself (constraint, syntax, permission)
    Rejected,
    /// No usable pool, or the pool is shutting down
    Unavailable,
    /// Anything else
    Fault,
}

/// Store failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// Missing or invalid target configuration (fatal at startup)
    #[error("Invalid store configuration: {0}")]
    Config(String),

    /// Connection reset, timeout, administrative termination
    #[error("Transient store failure")]
    Transient(#[source] BoxError),

    /// Constraint violation, syntax error, permission denial
    #[error("Store rejected the operation")]
    Rejected(#[source] BoxError),

    /// The store refused the configured credentials (SQLSTATE class 28)
    #[error("Store rejected the configured credentials")]
    AccessDenied(#[source] BoxError),

    /// No active pool (failover exhausted or never established)
    #[error("Store unavailable")]
    Unavailable,

    /// Shutdown began; no new acquisitions
    #[error("Store is draining")]
    Draining,

    /// In-flight operations did not finish within the drain timeout
    #[error("Drain timed out with {in_flight} operation(s) in flight")]
    DrainTimedOut { in_flight: usize },

    /// Unclassified failure
    #[error("Store fault")]
    Fault(#[source] BoxError),
}

/// A single operation exceeded the target's query timeout
#[derive(Debug, Error)]
#[error("Operation exceeded query timeout of {0:?}")]
pub struct QueryTimedOut(pub Duration);

impl StoreError {
    pub fn transient(source: impl Into<BoxError>) -> Self {
        Self::Transient(source.into())
    }

    pub fn rejected(source: impl Into<BoxError>) -> Self {
        Self::Rejected(source.into())
    }

    pub fn fault(source: impl Into<BoxError>) -> Self {
        Self::Fault(source.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            StoreError::Transient(_) => ErrorClass::Transient,
            StoreError::Rejected(_) | StoreError::AccessDenied(_) => ErrorClass::Rejected,
            StoreError::Unavailable | StoreError::Draining => ErrorClass::Unavailable,
            StoreError::Config(_) | StoreError::DrainTimedOut { .. } | StoreError::Fault(_) => {
                ErrorClass::Fault
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

/// Classify a sqlx error
///
/// SQLSTATE reference: <https://www.postgresql.org/docs/current/errcodes-appendix.html>
pub fn classify(err: &sqlx::Error) -> ErrorClass {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => ErrorClass::Transient,
        sqlx::Error::PoolClosed => ErrorClass::Unavailable,
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => classify_sqlstate(&code),
            None => ErrorClass::Fault,
        },
        _ => ErrorClass::Fault,
    }
}

fn classify_sqlstate(code: &str) -> ErrorClass {
    match code {
        // Class 57: Operator Intervention
        // query_canceled (statement timeout), admin_shutdown, crash_shutdown, cannot_connect_now
        "57014" | "57P01" | "57P02" | "57P03" => ErrorClass::Transient,
        // Class 08: Connection Exception
        c if c.starts_with("08") => ErrorClass::Transient,
        // Class 22: Data Exception
        // Class 23: Integrity Constraint Violation
        // Class 28: Invalid Authorization
        // Class 42: Syntax Error or Access Rule Violation
        c if c.starts_with("22")
            || c.starts_with("23")
            || c.starts_with("28")
            || c.starts_with("42") =>
        {
            ErrorClass::Rejected
        }
        _ => ErrorClass::Fault,
    }
}

/// SQLSTATE class 28: invalid authorization (bad password, unknown role)
fn is_access_denied(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| code.starts_with("28")),
        _ => false,
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_access_denied(&err) {
            return StoreError::AccessDenied(err.into());
        }
        match classify(&err) {
            ErrorClass::Transient => StoreError::transient(err),
            ErrorClass::Rejected => StoreError::rejected(err),
            ErrorClass::Unavailable => StoreError::Draining,
            ErrorClass::Fault => StoreError::fault(err),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        match err {
            sqlx::migrate::MigrateError::Execute(inner) => StoreError::from(inner),
            other => StoreError::fault(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_connection_failures_as_transient() {
        let reset = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        ));
        assert_eq!(classify(&reset), ErrorClass::Transient);
        assert_eq!(classify(&sqlx::Error::PoolTimedOut), ErrorClass::Transient);
    }

    #[test]
    fn test_classify_pool_closed_as_unavailable() {
        assert_eq!(classify(&sqlx::Error::PoolClosed), ErrorClass::Unavailable);
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolClosed),
            StoreError::Draining
        ));
    }

    #[test]
    fn test_classify_sqlstate() {
        assert_eq!(classify_sqlstate("57P01"), ErrorClass::Transient);
        assert_eq!(classify_sqlstate("57014"), ErrorClass::Transient);
        assert_eq!(classify_sqlstate("08006"), ErrorClass::Transient);
        assert_eq!(classify_sqlstate("23505"), ErrorClass::Rejected);
        assert_eq!(classify_sqlstate("42601"), ErrorClass::Rejected);
        assert_eq!(classify_sqlstate("42501"), ErrorClass::Rejected);
        assert_eq!(classify_sqlstate("28P01"), ErrorClass::Rejected);
        // Serialization failures are not replayed implicitly
        assert_eq!(classify_sqlstate("40001"), ErrorClass::Fault);
        assert_eq!(classify_sqlstate("XX000"), ErrorClass::Fault);
    }

    #[test]
    fn test_error_class() {
        assert!(StoreError::transient(QueryTimedOut(Duration::from_secs(1))).is_transient());
        assert_eq!(
            StoreError::rejected(std::io::Error::other("dup")).class(),
            ErrorClass::Rejected
        );
        assert_eq!(StoreError::Unavailable.class(), ErrorClass::Unavailable);
        assert_eq!(StoreError::Draining.class(), ErrorClass::Unavailable);
        assert_eq!(StoreError::Config("x".into()).class(), ErrorClass::Fault);
        assert_eq!(
            StoreError::AccessDenied(std::io::Error::other("28P01").into()).class(),
            ErrorClass::Rejected
        );
        assert!(!StoreError::AccessDenied(std::io::Error::other("28P01").into()).is_transient());
    }

    #[test]
    fn test_display_does_not_carry_source_detail() {
        let err = StoreError::transient(std::io::Error::other("10.1.2.3:5432 refused"));
        assert_eq!(err.to_string(), "Transient store failure");
    }
}
