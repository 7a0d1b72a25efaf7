//! Domain Layer
//!
//! Contains entities, value objects, and repository traits.

pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{Identity, Session, UserAccount};
pub use repository::{SessionRepository, UserRepository};
pub use value_object::UserRole;
