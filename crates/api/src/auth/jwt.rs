//! Access-token signing/verification and refresh-token material.
//!
//! Access tokens are HMAC-signed JWTs carrying a [`Claims`] payload. Refresh
//! tokens are opaque random strings; only their SHA-256 hash is stored
//! server-side so a database leak does not compromise active sessions.

use std::fmt;

use hippo_core::types::{DbId, Timestamp};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of random bytes behind every refresh token.
const REFRESH_TOKEN_BYTES: usize = 32;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject -- the user's database id as a decimal string.
    pub sub: String,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
}

/// Signing secret and token lifetimes. Immutable once the server starts.
#[derive(Clone)]
pub struct AuthConfig {
    secret: Vec<u8>,
    pub access_token_life: chrono::Duration,
    pub refresh_token_life: chrono::Duration,
}

impl AuthConfig {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        access_token_life: chrono::Duration,
        refresh_token_life: chrono::Duration,
    ) -> Self {
        Self {
            secret: secret.into(),
            access_token_life,
            refresh_token_life,
        }
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("access_token_life", &self.access_token_life)
            .field("refresh_token_life", &self.refresh_token_life)
            .finish()
    }
}

/// Sign an HS256 access token for `user_id`, issued at `now`.
pub fn encode_access_token(
    user_id: DbId,
    now: Timestamp,
    config: &AuthConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + config.access_token_life).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret()),
    )
}

/// Verify the signature of `token` and return its claims.
///
/// Any HMAC algorithm is accepted; every other algorithm (including `none`)
/// is rejected. Expiry is NOT checked here because the caller compares `exp`
/// against its own clock.
pub fn decode_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
    validation.leeway = 0;
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret()),
        &validation,
    )?;
    Ok(token_data.claims)
}

/// Generate a cryptographically random refresh token.
///
/// Returns `(plaintext_token, sha256_hex_hash)`. The plaintext is 64 lowercase
/// hex characters and goes to the client; only the hash is persisted.
pub fn generate_refresh_token() -> (String, String) {
    let bytes: [u8; REFRESH_TOKEN_BYTES] = rand::random();
    let plaintext: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    let hash = hash_refresh_token(&plaintext);
    (plaintext, hash)
}

/// Compute the SHA-256 hex digest of a refresh token.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
