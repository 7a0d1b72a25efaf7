//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Session authority, credential signing, sign-in
//! - `infra/` - PostgreSQL (via the query facade) and in-memory repositories
//! - `presentation/` - Auth gate middleware, HTTP handlers, DTOs, router
//!
//! ## Session Model
//! - One active session per user; a new sign-in supersedes the previous one
//! - Each session is bound to exactly one HMAC-signed bearer credential
//! - Rejections distinguish expired, superseded and invalid credentials

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::{AuthConfig, IssuedCredential, SessionAuthority};
pub use domain::{Identity, Session, UserRole};
pub use error::{AuthError, AuthResult};
pub use infra::{InMemoryAuthRepository, PgAuthRepository};
pub use presentation::{
    AuthAppState, AuthGateState, auth_router, authorize, require_identity, require_roles,
};
