//! Refresh token storage.
//!
//! Tokens are stored hashed in the `refreshtoken` table; the plaintext value
//! only ever exists in the token response.

use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use tokenbridge_auth::types::RefreshToken;

use crate::{PgPool, ResourceTuple, StorageError, StorageResult};

/// Refresh token row from database.
#[derive(Debug, Clone)]
pub struct RefreshTokenRow {
    /// Token UUID
    pub id: Uuid,
    /// Transaction ID (version)
    pub txid: i64,
    /// Timestamp
    pub ts: OffsetDateTime,
    /// Full token as JSONB
    pub resource: serde_json::Value,
    /// Row status (created, updated, deleted)
    pub status: String,
}

impl RefreshTokenRow {
    fn from_tuple(row: ResourceTuple) -> Self {
        Self {
            id: row.0,
            txid: row.1,
            ts: row.2,
            resource: row.3,
            status: row.4,
        }
    }

    /// Decodes the refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource does not deserialize.
    pub fn into_token(self) -> StorageResult<RefreshToken> {
        Ok(serde_json::from_value(self.resource)?)
    }
}

/// Refresh token operations.
pub struct RefreshTokenStore<'a> {
    pool: &'a PgPool,
}

impl<'a> RefreshTokenStore<'a> {
    /// Create a new store with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a token by its hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_token_hash(&self, token_hash: &str) -> StorageResult<Option<RefreshTokenRow>> {
        let row: Option<ResourceTuple> = query_as(
            r#"
            SELECT id, txid, ts, resource, status
            FROM refreshtoken
            WHERE resource->>'tokenHash' = $1
              AND status != 'deleted'
            "#,
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(RefreshTokenRow::from_tuple))
    }

    /// Insert a refresh token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id or hash is taken.
    pub async fn create(&self, token: &RefreshToken) -> StorageResult<RefreshTokenRow> {
        let resource = serde_json::to_value(token)?;

        let row: ResourceTuple = query_as(
            r#"
            INSERT INTO refreshtoken (id, txid, ts, resource, status)
            VALUES ($1, 1, NOW(), $2, 'created')
            RETURNING id, txid, ts, resource, status
            "#,
        )
        .bind(token.id)
        .bind(&resource)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx_core::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StorageError::conflict(format!(
                    "RefreshToken with id '{}' already exists",
                    token.id
                ));
            }
            StorageError::from(e)
        })?;

        Ok(RefreshTokenRow::from_tuple(row))
    }
}
