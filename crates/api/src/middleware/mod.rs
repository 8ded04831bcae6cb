//! Request middleware and extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a Bearer access token.
//! - [`timeout::timeout_envelope`] -- Per-request deadline with a single guarded response.
//! - [`guarded_writer::GuardedWriter`] -- The one-response sink the envelope is built on.

pub mod auth;
pub mod guarded_writer;
pub mod timeout;
