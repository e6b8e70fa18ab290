//! PostgreSQL storage backend for tokenbridge-auth
//!
//! Provides persistent storage for:
//!
//! - Access token records (`accesstoken`), including acting-user stamping
//! - Refresh tokens (`refreshtoken`), stored hashed
//! - User lookup for Google sign-in (`"user"`)
//!
//! Every table follows the same layout: `id`, `txid` (row version), `ts`,
//! `resource` (JSONB) and `status`.
//!
//! # Example
//!
//! ```ignore
//! use tokenbridge_auth_postgres::PostgresAuthStorage;
//!
//! let storage = PostgresAuthStorage::connect("postgres://localhost/tokenbridge").await?;
//! storage.ensure_schema().await?;
//!
//! let records = storage.token_record_storage();
//! records.stamp_acting_user("3f9a...", "user-17").await?;
//! ```

pub mod refresh_token;
pub mod storage_adapters;
pub mod token_record;
pub mod user;

use std::sync::Arc;

use sqlx_core::executor::Executor;
use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;
use time::OffsetDateTime;
use uuid::Uuid;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

/// Column tuple shared by every resource table.
pub(crate) type ResourceTuple = (Uuid, i64, OffsetDateTime, serde_json::Value, String);

pub use refresh_token::{RefreshTokenRow, RefreshTokenStore};
pub use storage_adapters::{
    PostgresRefreshTokenStorage, PostgresTokenRecordStorage, PostgresUserDirectory,
};
pub use token_record::{TokenRecordRow, TokenRecordStore};
pub use user::{UserRow, UserStore};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during auth storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Requested resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists, or was changed by a concurrent writer.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Create a `NotFound` error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a serialization error.
    #[must_use]
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Self::Serialization(_))
    }

    /// Returns `true` if this is a client error (4xx equivalent).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Conflict(_))
    }

    /// Returns `true` if this is a server error (5xx equivalent).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Serialization(_))
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Schema
// =============================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accesstoken (
    id       UUID PRIMARY KEY,
    txid     BIGINT NOT NULL,
    ts       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    resource JSONB NOT NULL,
    status   TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS accesstoken_token_id_idx
    ON accesstoken ((resource->>'tokenId'));

CREATE TABLE IF NOT EXISTS refreshtoken (
    id       UUID PRIMARY KEY,
    txid     BIGINT NOT NULL,
    ts       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    resource JSONB NOT NULL,
    status   TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS refreshtoken_token_hash_idx
    ON refreshtoken ((resource->>'tokenHash'));

CREATE TABLE IF NOT EXISTS "user" (
    id       UUID PRIMARY KEY,
    txid     BIGINT NOT NULL,
    ts       TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    resource JSONB NOT NULL,
    status   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS user_email_idx ON "user" (lower(resource->>'email'));
CREATE INDEX IF NOT EXISTS user_google_id_idx ON "user" ((resource->>'googleId'));
"#;

// =============================================================================
// PostgreSQL Auth Storage
// =============================================================================

/// PostgreSQL storage backend for authentication data.
#[derive(Debug, Clone)]
pub struct PostgresAuthStorage {
    pool: Arc<PgPool>,
}

impl PostgresAuthStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        use sqlx_core::pool::PoolOptions;
        let pool = PoolOptions::<Postgres>::new().connect(database_url).await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Creates the tables this crate reads and writes, if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a statement fails.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        (&*self.pool).execute(SCHEMA).await?;
        tracing::info!("Auth storage schema ready");
        Ok(())
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Token record operations.
    #[must_use]
    pub fn token_records(&self) -> TokenRecordStore<'_> {
        TokenRecordStore::new(&self.pool)
    }

    /// Refresh token operations.
    #[must_use]
    pub fn refresh_tokens(&self) -> RefreshTokenStore<'_> {
        RefreshTokenStore::new(&self.pool)
    }

    /// User lookup operations.
    #[must_use]
    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.pool)
    }

    /// Token record storage for the grant engine.
    #[must_use]
    pub fn token_record_storage(&self) -> PostgresTokenRecordStorage {
        PostgresTokenRecordStorage::new(Arc::clone(&self.pool))
    }

    /// Refresh token storage for the grant engine.
    #[must_use]
    pub fn refresh_token_storage(&self) -> PostgresRefreshTokenStorage {
        PostgresRefreshTokenStorage::new(Arc::clone(&self.pool))
    }

    /// User directory for the Google identity bridge.
    #[must_use]
    pub fn user_directory(&self) -> PostgresUserDirectory {
        PostgresUserDirectory::new(Arc::clone(&self.pool))
    }
}

// =============================================================================
// Tests
// =============================================================================
