//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- access-token signing/verification and refresh-token material.
//! - [`session_store`] -- atomic storage of refresh sessions.
//! - [`authority`] -- the credential lifecycle: issue, verify, rotate.

pub mod authority;
pub mod jwt;
pub mod password;
pub mod session_store;

pub use authority::{CredentialAuthority, CredentialPair};
pub use jwt::AuthConfig;
pub use password::{Argon2Hasher, PasswordHasher};
pub use session_store::{MemorySessionStore, PgSessionStore, SessionStore, StoreError};
