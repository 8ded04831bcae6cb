pub mod auth;
pub mod medicine;
