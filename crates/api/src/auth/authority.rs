//! The credential lifecycle: issue a pair, verify an access token, rotate a
//! refresh token.
//!
//! Every refresh token is single-use. [`CredentialAuthority::rotate`] consumes
//! the presented session before anything else, so a replayed or concurrently
//! presented token fails with [`CredentialError::SessionNotFound`].

use std::sync::Arc;

use hippo_core::clock::Clock;
use hippo_core::error::CredentialError;
use hippo_core::types::{DbId, Timestamp};
use hippo_db::models::session::CreateRefreshSession;

use crate::auth::jwt::{
    decode_access_token, encode_access_token, generate_refresh_token, hash_refresh_token,
    AuthConfig,
};
use crate::auth::session_store::{SessionStore, StoreError};

/// An access token and the refresh token that can replace it.
#[derive(Debug, Clone)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub refresh_expires_at: Timestamp,
}

pub struct CredentialAuthority {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: Arc<AuthConfig>,
}

impl CredentialAuthority {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, config: AuthConfig) -> Self {
        Self {
            store,
            clock,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Sign an access token for `user_id` and persist a fresh refresh session.
    ///
    /// All-or-nothing: if the session cannot be stored no token is returned.
    pub async fn issue_pair(&self, user_id: DbId) -> Result<CredentialPair, CredentialError> {
        let now = self.clock.now();

        // Both expiries must be representable before anything is signed.
        let out_of_range =
            || CredentialError::Persistence("token lifetime exceeds the supported time range".into());
        now.checked_add_signed(self.config.access_token_life)
            .ok_or_else(out_of_range)?;
        let refresh_expires_at = now
            .checked_add_signed(self.config.refresh_token_life)
            .ok_or_else(out_of_range)?;

        let access_token = encode_access_token(user_id, now, &self.config)
            .map_err(|e| CredentialError::Persistence(format!("token signing failed: {e}")))?;

        let (refresh_token, token_hash) = generate_refresh_token();

        self.store
            .save(CreateRefreshSession {
                user_id,
                token_hash,
                expires_at: refresh_expires_at,
                created_at: now,
            })
            .await
            .map_err(|e| CredentialError::Persistence(e.to_string()))?;

        tracing::debug!(user_id, "Issued credential pair");

        Ok(CredentialPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_token_life.num_seconds(),
            refresh_expires_at,
        })
    }

    /// Return the user id carried by a valid access token.
    pub fn verify_access(&self, token: &str) -> Result<DbId, CredentialError> {
        let claims =
            decode_access_token(token, &self.config).map_err(|_| CredentialError::InvalidToken)?;

        if claims.exp < self.clock.now().timestamp() {
            return Err(CredentialError::InvalidToken);
        }

        claims
            .sub
            .parse::<DbId>()
            .map_err(|_| CredentialError::InvalidToken)
    }

    /// Trade a refresh token for a new pair, retiring the old token.
    ///
    /// The session is consumed before its expiry is checked, so an expired
    /// token is gone after the first (failing) attempt.
    pub async fn rotate(&self, refresh_token: &str) -> Result<CredentialPair, CredentialError> {
        let token_hash = hash_refresh_token(refresh_token);

        let session = match self.store.consume_by_token(&token_hash).await {
            Ok(session) => session,
            Err(StoreError::NotFound) => return Err(CredentialError::SessionNotFound),
            Err(StoreError::Persistence(msg)) => return Err(CredentialError::Persistence(msg)),
        };

        if session.is_expired_at(self.clock.now()) {
            tracing::info!(
                user_id = session.user_id,
                session_id = session.id,
                "Rejected expired refresh session"
            );
            return Err(CredentialError::SessionExpired);
        }

        self.issue_pair(session.user_id).await
    }
}
