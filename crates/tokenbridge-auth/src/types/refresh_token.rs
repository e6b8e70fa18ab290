//! Refresh token domain type.
//!
//! This module defines the refresh token structure used for persisting
//! OAuth 2.0 refresh tokens.
//!
//! # Security
//!
//! - Refresh tokens are stored as SHA-256 hashes, never plaintext
//! - Each refresh token is bound to exactly one access token

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Refresh token stored in the database.
///
/// The token itself is never stored. Only a SHA-256 hash is persisted,
/// similar to password storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Unique identifier for this refresh token record.
    pub id: Uuid,

    /// SHA-256 hash of the actual token value.
    pub token_hash: String,

    /// Public identifier of the access token this refresh token is bound to.
    pub access_token_id: String,

    /// Client ID that this token was issued to.
    pub client_id: String,

    /// User ID the token was issued for.
    pub user_id: String,

    /// When this token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl RefreshToken {
    /// Hash a token value using SHA-256.
    ///
    /// This is used both when storing new tokens and when looking up
    /// tokens for validation.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Generate a cryptographically secure random token.
    ///
    /// Returns a 256-bit random value encoded as base64url (43 characters).
    #[must_use]
    pub fn generate_token() -> String {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}
