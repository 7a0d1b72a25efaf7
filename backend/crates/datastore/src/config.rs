//! Connection Target Registry
//!
//! Resolves the primary and (optional) fallback store targets from
//! environment-style key/value configuration. Everything here is immutable
//! once resolved at startup.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{StoreError, StoreResult};

/// Which configured target a pool was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRole {
    Primary,
    Fallback,
}

impl TargetRole {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TargetRole::Primary => "primary",
            TargetRole::Fallback => "fallback",
        }
    }
}

impl fmt::Display for TargetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport security policy for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    Disable,
    #[default]
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl FromStr for TlsMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(TlsMode::Disable),
            "prefer" => Ok(TlsMode::Prefer),
            "require" => Ok(TlsMode::Require),
            "verify-ca" => Ok(TlsMode::VerifyCa),
            "verify-full" => Ok(TlsMode::VerifyFull),
            other => Err(StoreError::Config(format!("unknown TLS mode `{other}`"))),
        }
    }
}

/// Bounds on physical connections held by one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolBounds {
    pub min_connections: u32,
    pub max_connections: u32,
}

impl Default for PoolBounds {
    fn default() -> Self {
        Self {
            min_connections: 0,
            max_connections: 10,
        }
    }
}

/// Per-target timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Establishing a connection / acquiring one from the pool
    pub connect: Duration,
    /// Idle connections older than this are closed
    pub idle: Duration,
    /// Upper bound on a single facade operation
    pub query: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            idle: Duration::from_secs(600),
            query: Duration::from_secs(30),
        }
    }
}

/// A fully specified endpoint for the relational store
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub tls: TlsMode,
    pub pool: PoolBounds,
    pub timeouts: Timeouts,
}

impl ConnectionTarget {
    /// `user@host:port/database`, safe to log
    pub fn addr(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }

    fn validate(&self) -> StoreResult<()> {
        if self.host.trim().is_empty() {
            return Err(StoreError::Config("host must not be empty".into()));
        }
        if self.database.trim().is_empty() {
            return Err(StoreError::Config("database name must not be empty".into()));
        }
        if self.user.trim().is_empty() {
            return Err(StoreError::Config("user must not be empty".into()));
        }
        if self.pool.max_connections == 0 {
            return Err(StoreError::Config("pool max must be at least 1".into()));
        }
        if self.pool.min_connections > self.pool.max_connections {
            return Err(StoreError::Config(format!(
                "pool min ({}) exceeds pool max ({})",
                self.pool.min_connections, self.pool.max_connections
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("tls", &self.tls)
            .field("pool", &self.pool)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

/// Target selection switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetSelection {
    /// Use the primary target; fail over to the local one if configured
    #[default]
    Primary,
    /// Use the local target only (no failover)
    Local,
}

impl FromStr for TargetSelection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(TargetSelection::Primary),
            "local" => Ok(TargetSelection::Local),
            other => Err(StoreError::Config(format!(
                "unknown target selection `{other}` (expected `primary` or `local`)"
            ))),
        }
    }
}

/// One primary target and at most one fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRegistry {
    primary: ConnectionTarget,
    fallback: Option<ConnectionTarget>,
}

impl TargetRegistry {
    pub fn new(primary: ConnectionTarget, fallback: Option<ConnectionTarget>) -> StoreResult<Self> {
        primary.validate()?;
        if let Some(fallback) = &fallback {
            fallback.validate()?;
        }
        Ok(Self { primary, fallback })
    }

    pub fn primary(&self) -> &ConnectionTarget {
        &self.primary
    }

    pub fn fallback(&self) -> Option<&ConnectionTarget> {
        self.fallback.as_ref()
    }
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub registry: TargetRegistry,
    /// The "time unit" every backoff schedule is expressed in
    pub retry_unit: Duration,
    /// How long shutdown waits for in-flight operations
    pub drain_timeout: Duration,
}

const PRIMARY_PREFIX: &str = "DB_";
const LOCAL_PREFIX: &str = "DB_LOCAL_";

impl StoreConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> StoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    ///
    /// `DB_TARGET` selects `primary` (default) or `local`. A fallback exists
    /// only when `DB_LOCAL_HOST` is set.
    pub fn from_lookup<F>(lookup: F) -> StoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let selection = match lookup("DB_TARGET") {
            Some(value) => value.parse()?,
            None => TargetSelection::default(),
        };

        let local_configured = lookup(&format!("{LOCAL_PREFIX}HOST")).is_some();
        let registry = match selection {
            TargetSelection::Primary => {
                let primary = read_target(&lookup, PRIMARY_PREFIX)?;
                let fallback = if local_configured {
                    Some(read_target(&lookup, LOCAL_PREFIX)?)
                } else {
                    None
                };
                TargetRegistry::new(primary, fallback)?
            }
            TargetSelection::Local => {
                if !local_configured {
                    return Err(StoreError::Config(
                        "DB_TARGET=local requires DB_LOCAL_HOST".into(),
                    ));
                }
                TargetRegistry::new(read_target(&lookup, LOCAL_PREFIX)?, None)?
            }
        };

        Ok(Self {
            registry,
            retry_unit: Duration::from_millis(parse_or(&lookup, "DB_RETRY_UNIT_MS", 1000)?),
            drain_timeout: Duration::from_secs(parse_or(&lookup, "DB_DRAIN_TIMEOUT_SECS", 30)?),
        })
    }
}

fn read_target<F>(lookup: &F, prefix: &str) -> StoreResult<ConnectionTarget>
where
    F: Fn(&str) -> Option<String>,
{
    let key = |name: &str| format!("{prefix}{name}");
    let defaults = Timeouts::default();
    let bounds = PoolBounds::default();

    Ok(ConnectionTarget {
        host: required(lookup, &key("HOST"))?,
        port: parse_or(lookup, &key("PORT"), 5432)?,
        database: required(lookup, &key("NAME"))?,
        user: required(lookup, &key("USER"))?,
        password: required(lookup, &key("PASSWORD"))?,
        tls: match lookup(&key("SSL_MODE")) {
            Some(value) => value.parse()?,
            None => TlsMode::default(),
        },
        pool: PoolBounds {
            min_connections: parse_or(lookup, &key("POOL_MIN"), bounds.min_connections)?,
            max_connections: parse_or(lookup, &key("POOL_MAX"), bounds.max_connections)?,
        },
        timeouts: Timeouts {
            connect: secs_or(lookup, &key("CONNECT_TIMEOUT_SECS"), defaults.connect)?,
            idle: secs_or(lookup, &key("IDLE_TIMEOUT_SECS"), defaults.idle)?,
            query: secs_or(lookup, &key("QUERY_TIMEOUT_SECS"), defaults.query)?,
        },
    })
}

fn required<F>(lookup: &F, key: &str) -> StoreResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StoreError::Config(format!("{key} must be set")))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> StoreResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| StoreError::Config(format!("{key} has an invalid value"))),
        None => Ok(default),
    }
}

fn secs_or<F>(lookup: &F, key: &str, default: Duration) -> StoreResult<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default.as_secs()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const PRIMARY: &[(&str, &str)] = &[
        ("DB_HOST", "db.transit.internal"),
        ("DB_NAME", "transit"),
        ("DB_USER", "transit_app"),
        ("DB_PASSWORD", "hunter2"),
    ];

    #[test]
    fn test_primary_only() {
        let config = StoreConfig::from_lookup(env(PRIMARY)).unwrap();
        let primary = config.registry.primary();

        assert_eq!(primary.host, "db.transit.internal");
        assert_eq!(primary.port, 5432);
        assert_eq!(primary.tls, TlsMode::Prefer);
        assert_eq!(primary.pool, PoolBounds::default());
        assert_eq!(primary.timeouts, Timeouts::default());
        assert!(config.registry.fallback().is_none());
        assert_eq!(config.retry_unit, Duration::from_secs(1));
        assert_eq!(config.drain_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_primary_with_fallback() {
        let mut pairs = PRIMARY.to_vec();
        pairs.extend_from_slice(&[
            ("DB_LOCAL_HOST", "localhost"),
            ("DB_LOCAL_PORT", "5433"),
            ("DB_LOCAL_NAME", "transit"),
            ("DB_LOCAL_USER", "postgres"),
            ("DB_LOCAL_PASSWORD", "postgres"),
            ("DB_LOCAL_SSL_MODE", "disable"),
            ("DB_LOCAL_POOL_MAX", "4"),
            ("DB_LOCAL_QUERY_TIMEOUT_SECS", "5"),
        ]);
        let config = StoreConfig::from_lookup(env(&pairs)).unwrap();
        let fallback = config.registry.fallback().unwrap();

        assert_eq!(fallback.port, 5433);
        assert_eq!(fallback.tls, TlsMode::Disable);
        assert_eq!(fallback.pool.max_connections, 4);
        assert_eq!(fallback.timeouts.query, Duration::from_secs(5));
        assert_eq!(fallback.addr(), "postgres@localhost:5433/transit");
    }

    #[test]
    fn test_explicit_local_selection_disables_failover() {
        let pairs = [
            ("DB_TARGET", "local"),
            ("DB_LOCAL_HOST", "localhost"),
            ("DB_LOCAL_NAME", "transit"),
            ("DB_LOCAL_USER", "postgres"),
            ("DB_LOCAL_PASSWORD", "postgres"),
        ];
        let config = StoreConfig::from_lookup(env(&pairs)).unwrap();

        assert_eq!(config.registry.primary().host, "localhost");
        assert!(config.registry.fallback().is_none());
    }

    #[test]
    fn test_local_selection_without_local_target() {
        let mut pairs = PRIMARY.to_vec();
        pairs.push(("DB_TARGET", "local"));
        let err = StoreConfig::from_lookup(env(&pairs)).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn test_missing_credential_is_config_error() {
        let pairs: Vec<_> = PRIMARY
            .iter()
            .copied()
            .filter(|(k, _)| *k != "DB_PASSWORD")
            .collect();
        let err = StoreConfig::from_lookup(env(&pairs)).unwrap_err();
        assert!(err.to_string().contains("DB_PASSWORD"));
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for (key, value) in [
            ("DB_PORT", "not-a-port"),
            ("DB_SSL_MODE", "sometimes"),
            ("DB_TARGET", "secondary"),
            ("DB_POOL_MAX", "0"),
        ] {
            let mut pairs = PRIMARY.to_vec();
            pairs.push((key, value));
            let result = StoreConfig::from_lookup(env(&pairs));
            assert!(
                matches!(result, Err(StoreError::Config(_))),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_pool_min_above_max_is_rejected() {
        let mut pairs = PRIMARY.to_vec();
        pairs.extend_from_slice(&[("DB_POOL_MIN", "8"), ("DB_POOL_MAX", "2")]);
        assert!(StoreConfig::from_lookup(env(&pairs)).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = StoreConfig::from_lookup(env(PRIMARY)).unwrap();
        let debug = format!("{:?}", config.registry.primary());
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
