//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::fmt;
use std::time::Duration;

use crate::error::{AuthError, AuthResult};

/// Minimum decoded length of the credential signing secret
pub const MIN_SECRET_LEN: usize = 32;

const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 3600);

/// Longest accepted credential lifetime (one year)
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 3600);

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC-SHA256 key for credential signing
    pub token_secret: Vec<u8>,
    /// Credential lifetime (also the session's expiry)
    pub token_ttl: Duration,
}

impl AuthConfig {
    /// Create config with a random signing secret (for development)
    pub fn with_random_secret() -> Self {
        Self {
            token_secret: platform::crypto::random_bytes(MIN_SECRET_LEN),
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }

    /// Read configuration from the process environment
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    ///
    /// `AUTH_TOKEN_SECRET` is base64 and must decode to at least 32 bytes.
    /// Debug builds fall back to a random secret when it is unset.
    pub fn from_lookup<F>(lookup: F) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token_secret = match lookup("AUTH_TOKEN_SECRET") {
            Some(encoded) => {
                let secret = platform::crypto::from_base64(encoded.trim()).map_err(|_| {
                    AuthError::Config("AUTH_TOKEN_SECRET must be base64".to_string())
                })?;
                if secret.len() < MIN_SECRET_LEN {
                    return Err(AuthError::Config(format!(
                        "AUTH_TOKEN_SECRET must decode to at least {MIN_SECRET_LEN} bytes"
                    )));
                }
                secret
            }
            None if cfg!(debug_assertions) => {
                tracing::warn!(
                    "AUTH_TOKEN_SECRET not set; using a random secret (credentials will not survive restart)"
                );
                platform::crypto::random_bytes(MIN_SECRET_LEN)
            }
            None => {
                return Err(AuthError::Config("AUTH_TOKEN_SECRET must be set".to_string()));
            }
        };

        let token_ttl = match lookup("AUTH_TOKEN_TTL_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(AuthError::Config(
                        "AUTH_TOKEN_TTL_SECS must be a positive integer".to_string(),
                    ));
                }
            },
            None => DEFAULT_TOKEN_TTL,
        };

        let config = Self {
            token_secret,
            token_ttl,
        };
        config.session_ttl()?;
        Ok(config)
    }

    /// Credential lifetime as a session TTL, bounded by [`MAX_TOKEN_TTL`]
    pub fn session_ttl(&self) -> AuthResult<chrono::Duration> {
        if self.token_ttl.is_zero() || self.token_ttl > MAX_TOKEN_TTL {
            return Err(AuthError::Config(format!(
                "Token TTL must be between 1s and {}s",
                MAX_TOKEN_TTL.as_secs()
            )));
        }
        chrono::Duration::from_std(self.token_ttl)
            .map_err(|e| AuthError::Config(format!("Invalid token TTL: {e}")))
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 32 bytes of 0x2a
    const SECRET_B64: &str = "KioqKioqKioqKioqKioqKioqKioqKioqKioqKioqKio=";

    #[test]
    fn test_from_lookup() {
        let config = AuthConfig::from_lookup(|key| match key {
            "AUTH_TOKEN_SECRET" => Some(SECRET_B64.to_string()),
            "AUTH_TOKEN_TTL_SECS" => Some("3600".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.token_secret, vec![0x2a; 32]);
        assert_eq!(config.token_ttl, Duration::from_secs(3600));
        assert_eq!(config.session_ttl().unwrap(), chrono::Duration::hours(1));
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let result = AuthConfig::from_lookup(|key| {
            (key == "AUTH_TOKEN_SECRET").then(|| "c2hvcnQ=".to_string())
        });
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let result = AuthConfig::from_lookup(|key| match key {
            "AUTH_TOKEN_SECRET" => Some(SECRET_B64.to_string()),
            "AUTH_TOKEN_TTL_SECS" => Some("0".to_string()),
            _ => None,
        });
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_ttl_beyond_maximum_is_rejected() {
        for raw in ["31536001", "1000000000000000"] {
            let result = AuthConfig::from_lookup(|key| match key {
                "AUTH_TOKEN_SECRET" => Some(SECRET_B64.to_string()),
                "AUTH_TOKEN_TTL_SECS" => Some(raw.to_string()),
                _ => None,
            });
            assert!(matches!(result, Err(AuthError::Config(_))), "{raw}");
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", AuthConfig::with_random_secret());
        assert!(debug.contains("[REDACTED]"));
    }
}
