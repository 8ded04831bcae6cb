//! Row types and DTOs, one module per table.

pub mod medicine;
pub mod session;
pub mod user;
