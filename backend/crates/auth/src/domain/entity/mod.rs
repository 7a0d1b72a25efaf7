//! Entities

pub mod identity;
pub mod session;
pub mod user_account;

pub use identity::Identity;
pub use session::Session;
pub use user_account::UserAccount;
