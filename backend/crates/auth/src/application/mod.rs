//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod credential;
pub mod session_authority;
pub mod sign_in;

// Re-exports
pub use config::AuthConfig;
pub use credential::{Claims, CredentialSigner};
pub use session_authority::{IssuedCredential, SessionAuthority};
pub use sign_in::{SignInInput, SignInUseCase};
