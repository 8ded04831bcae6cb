use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures of the credential lifecycle (issue, verify, rotate).
///
/// Closed set: callers match exhaustively. The three client-fault variants all
/// map to 401; `Persistence` is a server fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// Access token is malformed, unsigned, wrongly signed, expired, or carries
    /// a non-integer subject.
    #[error("invalid access token")]
    InvalidToken,

    /// Refresh token was never issued or has already been consumed.
    #[error("refresh session not found")]
    SessionNotFound,

    /// Refresh token existed but its session had lapsed. The session is
    /// consumed regardless.
    #[error("refresh session expired")]
    SessionExpired,

    /// The session store (or token signer) failed.
    #[error("credential persistence failed: {0}")]
    Persistence(String),
}
