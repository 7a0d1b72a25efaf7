//! Bearer credential extraction
//!
//! Parses `Authorization: Bearer <credential>` headers.

use axum::http::{HeaderMap, header};

/// Error when extracting a bearer credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BearerError {
    /// No `Authorization` header at all
    #[error("Missing Authorization header")]
    Missing,
    /// Header present but not `Bearer <non-empty credential>`
    #[error("Malformed Authorization header")]
    Malformed,
}

const SCHEME: &str = "bearer";

/// Extract the bearer credential from request headers
///
/// The scheme is matched case-insensitively (RFC 9110 §11.1).
///
/// ## Returns
/// * `Ok(&str)` - the credential, trimmed
/// * `Err(BearerError::Missing)` - no `Authorization` header
/// * `Err(BearerError::Malformed)` - wrong scheme, empty credential, or non-ASCII value
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, BearerError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(BearerError::Missing)?
        .to_str()
        .map_err(|_| BearerError::Malformed)?;

    let (scheme, credential) = value
        .trim()
        .split_once(' ')
        .ok_or(BearerError::Malformed)?;

    if !scheme.eq_ignore_ascii_case(SCHEME) {
        return Err(BearerError::Malformed);
    }

    let credential = credential.trim();
    if credential.is_empty() {
        return Err(BearerError::Malformed);
    }

    Ok(credential)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_extract_bearer() {
        let headers = headers_with("Bearer abc.def");
        assert_eq!(extract_bearer(&headers), Ok("abc.def"));

        let headers = headers_with("bearer   abc.def  ");
        assert_eq!(extract_bearer(&headers), Ok("abc.def"));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(extract_bearer(&HeaderMap::new()), Err(BearerError::Missing));
    }

    #[test]
    fn test_malformed_header() {
        assert_eq!(
            extract_bearer(&headers_with("Basic dXNlcjpwYXNz")),
            Err(BearerError::Malformed)
        );
        assert_eq!(
            extract_bearer(&headers_with("Bearer")),
            Err(BearerError::Malformed)
        );
        assert_eq!(
            extract_bearer(&headers_with("Bearer    ")),
            Err(BearerError::Malformed)
        );
    }
}
