//! Refresh token storage trait.
//!
//! # Security Considerations
//!
//! - Tokens are stored as SHA-256 hashes only
//! - Access to this storage should be restricted

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::refresh_token::RefreshToken;

/// Storage trait for refresh tokens.
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Stores a new refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`](crate::AuthError::Conflict) if a token
    /// with the same hash exists, or a storage error.
    async fn create(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Finds a refresh token by its hash, whether or not it has expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>>;
}
