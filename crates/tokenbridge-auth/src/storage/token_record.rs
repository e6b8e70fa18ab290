//! Access token record storage.
//!
//! Besides creation and lookup, this trait carries the augmentation hook that
//! stamps an "acting-as" user identifier onto an already-issued token.
//!
//! # Concurrency
//!
//! [`TokenRecordStorage::update`] is a compare-and-swap on
//! [`TokenRecord::version`]: it only writes when the stored version still
//! equals the version that was read. Two stampers racing on the same token
//! therefore cannot silently overwrite each other; the loser gets
//! [`AuthError::Conflict`].

use async_trait::async_trait;
use tracing::debug;

use crate::AuthResult;
use crate::error::AuthError;
use crate::types::TokenRecord;

/// Persistence for issued access tokens.
#[async_trait]
pub trait TokenRecordStorage: Send + Sync {
    /// Stores the record of a freshly issued access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] if the identifier is already taken,
    /// or a storage error.
    async fn create(&self, record: &TokenRecord) -> AuthResult<()>;

    /// Finds a record by the access token's public identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_token_id(&self, token_id: &str) -> AuthResult<Option<TokenRecord>>;

    /// Writes `record` if the stored version equals `record.version`.
    ///
    /// Returns the stored record with its bumped version.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotFound`] if no record exists for the identifier
    /// - [`AuthError::Conflict`] if the stored version moved on
    async fn update(&self, record: &TokenRecord) -> AuthResult<TokenRecord>;

    /// Stamps `user_id` as the acting user of the token `token_id`.
    ///
    /// Read-modify-write of a single record guarded by [`Self::update`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotFound`] if no record exists for `token_id`;
    /// the store is left unchanged in that case.
    async fn stamp_acting_user(&self, token_id: &str, user_id: &str) -> AuthResult<()> {
        let mut record = self
            .find_by_token_id(token_id)
            .await?
            .ok_or_else(|| AuthError::not_found(format!("Access token {token_id}")))?;

        record.acting_user_id = Some(user_id.to_string());
        let stored = self.update(&record).await?;

        debug!(
            token_id = %token_id,
            acting_user_id = %user_id,
            version = stored.version,
            "Acting user stamped on token record"
        );

        Ok(())
    }

    /// Marks the token `token_id` as revoked.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotFound`] if no record exists for `token_id`.
    async fn revoke(&self, token_id: &str) -> AuthResult<()> {
        let mut record = self
            .find_by_token_id(token_id)
            .await?
            .ok_or_else(|| AuthError::not_found(format!("Access token {token_id}")))?;

        record.revoked = true;
        self.update(&record).await?;

        debug!(token_id = %token_id, "Token record revoked");
        Ok(())
    }
}
