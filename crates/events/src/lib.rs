//! Audit sidecar for the Hippo service.
//!
//! - [`AuditEntry`] -- what happened to which entity, and when.
//! - [`AuditNotifier`] -- the delivery seam (HTTP collector or log-only).
//! - [`AuditDispatcher`] -- bounded fire-and-forget dispatch; failures are
//!   logged and never reach the request path.

pub mod audit;
pub mod delivery;
pub mod dispatcher;

pub use audit::{AuditAction, AuditEntity, AuditEntry, AuditError, AuditNotifier};
pub use delivery::http::HttpAuditNotifier;
pub use delivery::log::LogAuditNotifier;
pub use dispatcher::AuditDispatcher;
