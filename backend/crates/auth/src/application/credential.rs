//! Signed Credentials
//!
//! HS256 JWTs. A credential is never mutated after issue and carries no
//! session state; whether it is honoured also depends on the referenced
//! session.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use kernel::id::{SessionId, UserId};
use serde::{Deserialize, Serialize};

use crate::domain::entity::Session;
use crate::domain::value_object::UserRole;
use crate::error::{AuthError, AuthResult};

/// Credential claims (timestamps are Unix seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub role: UserRole,
    pub sid: SessionId,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn for_session(session: &Session) -> Self {
        Self {
            sub: session.user_id,
            role: session.role,
            sid: session.session_id,
            iat: session.issued_at.timestamp(),
            exp: session.expires_at.timestamp(),
        }
    }
}

/// Signs and verifies credentials with one HMAC key
#[derive(Clone)]
pub struct CredentialSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl CredentialSigner {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn sign(&self, claims: &Claims) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to sign credential: {e}")))
    }

    /// Verify signature, then expiry against the current time
    ///
    /// A token with a bad signature is `InvalidToken` even when it is also
    /// past its expiry.
    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })
    }
}

impl std::fmt::Debug for CredentialSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSigner")
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn claims(exp_offset_secs: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: UserId::new(),
            role: UserRole::Passenger,
            sid: SessionId::new(),
            iat: now,
            exp: now + exp_offset_secs,
        }
    }

    fn signer() -> CredentialSigner {
        CredentialSigner::new(&[7u8; 32])
    }

    #[test]
    fn test_sign_and_verify() {
        let claims = claims(3600);
        let token = signer().sign(&claims).unwrap();

        assert_eq!(token.matches('.').count(), 2);
        assert_eq!(signer().verify(&token).unwrap(), claims);
    }

    #[test]
    fn test_expired_token() {
        let token = signer().sign(&claims(-10)).unwrap();
        assert!(matches!(
            signer().verify(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_key_is_invalid_even_when_expired() {
        let token = signer().sign(&claims(-10)).unwrap();
        let other = CredentialSigner::new(&[8u8; 32]);
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_tampered_payload_is_invalid() {
        let token = signer().sign(&claims(3600)).unwrap();
        let mut forged = claims(3600);
        forged.role = UserRole::Admin;
        let forged_token = signer().sign(&forged).unwrap();

        // Splice the forged payload onto the original signature
        let parts: Vec<&str> = token.split('.').collect();
        let forged_parts: Vec<&str> = forged_token.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], forged_parts[1], parts[2]);

        assert!(matches!(
            signer().verify(&spliced),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        for token in ["", "no-dot", "a.b", "a.b.c", "!!!.???.***", ".."] {
            assert!(
                matches!(signer().verify(token), Err(AuthError::InvalidToken)),
                "{token:?} should be invalid"
            );
        }
    }
}
