//! Arc-owning storage adapters implementing the `tokenbridge-auth` traits.
//!
//! These adapters wrap the lifetime-based stores and own an `Arc<PgPool>`,
//! so they can be handed to the grant engine as `Arc<dyn Trait>`.

use std::sync::Arc;

use async_trait::async_trait;

use tokenbridge_auth::federation::{GoogleProfile, UserDirectory};
use tokenbridge_auth::storage::{RefreshTokenStorage, TokenRecordStorage};
use tokenbridge_auth::types::{RefreshToken, TokenRecord, UserIdentity};
use tokenbridge_auth::{AuthError, AuthResult};

use crate::refresh_token::RefreshTokenStore;
use crate::token_record::TokenRecordStore;
use crate::user::UserStore;
use crate::{PgPool, StorageError};

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(resource) => AuthError::not_found(resource),
            StorageError::Conflict(message) => AuthError::conflict(message),
            other => AuthError::storage(other.to_string()),
        }
    }
}

// =============================================================================
// Arc-Owning Token Record Storage
// =============================================================================

/// PostgreSQL token record storage.
///
/// The default `stamp_acting_user` read-modify-write runs against
/// [`TokenRecordStore::update`], which is conditional on `txid`; a writer that
/// loses the race gets [`AuthError::Conflict`].
#[derive(Clone)]
pub struct PostgresTokenRecordStorage {
    pool: Arc<PgPool>,
}

impl PostgresTokenRecordStorage {
    /// Create a new Arc-owning token record storage.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRecordStorage for PostgresTokenRecordStorage {
    async fn create(&self, record: &TokenRecord) -> AuthResult<()> {
        TokenRecordStore::new(&self.pool).create(record).await?;
        Ok(())
    }

    async fn find_by_token_id(&self, token_id: &str) -> AuthResult<Option<TokenRecord>> {
        let row = TokenRecordStore::new(&self.pool)
            .find_by_token_id(token_id)
            .await?;
        Ok(row.map(|r| r.into_record()).transpose()?)
    }

    async fn update(&self, record: &TokenRecord) -> AuthResult<TokenRecord> {
        let row = TokenRecordStore::new(&self.pool).update(record).await?;
        Ok(row.into_record()?)
    }
}

// =============================================================================
// Arc-Owning Refresh Token Storage
// =============================================================================

/// PostgreSQL refresh token storage.
#[derive(Clone)]
pub struct PostgresRefreshTokenStorage {
    pool: Arc<PgPool>,
}

impl PostgresRefreshTokenStorage {
    /// Create a new Arc-owning refresh token storage.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStorage for PostgresRefreshTokenStorage {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        RefreshTokenStore::new(&self.pool).create(token).await?;
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        let row = RefreshTokenStore::new(&self.pool)
            .find_by_token_hash(token_hash)
            .await?;
        Ok(row.map(|r| r.into_token()).transpose()?)
    }
}

// =============================================================================
// Arc-Owning User Directory
// =============================================================================

/// PostgreSQL user directory for the Google identity bridge.
#[derive(Clone)]
pub struct PostgresUserDirectory {
    pool: Arc<PgPool>,
}

impl PostgresUserDirectory {
    /// Create a new Arc-owning user directory.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_by_google_profile(
        &self,
        profile: &GoogleProfile,
    ) -> AuthResult<Option<UserIdentity>> {
        let store = UserStore::new(&self.pool);

        if let Some(row) = store.find_by_google_id(&profile.sub).await? {
            return Ok(Some(row.to_identity()));
        }

        let Some(email) = profile.email.as_deref() else {
            return Ok(None);
        };

        Ok(store.find_by_email(email).await?.map(|row| row.to_identity()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_maps_to_auth_error() {
        let err: AuthError = StorageError::not_found("AccessToken abc").into();
        assert!(matches!(err, AuthError::NotFound { .. }));

        let err: AuthError = StorageError::conflict("txid moved").into();
        assert!(matches!(err, AuthError::Conflict { .. }));

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AuthError = StorageError::from(json_err).into();
        assert!(matches!(err, AuthError::Storage { .. }));
    }
}
