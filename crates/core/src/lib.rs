//! Shared domain primitives for the Hippo service.
//!
//! Zero internal dependencies so the repository, event and API crates can all
//! depend on it.

pub mod clock;
pub mod error;
pub mod types;
pub mod validation;
