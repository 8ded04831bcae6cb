//! Concrete [`AuditNotifier`](crate::AuditNotifier) implementations.

pub mod http;
pub mod log;
