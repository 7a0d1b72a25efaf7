//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Secure random bytes and base64 secret decoding
//! - `Authorization: Bearer` header parsing
//! - Password verification (Argon2id)

pub mod bearer;
pub mod crypto;
pub mod password;
