//! Access token record storage.
//!
//! One row per issued access token in the `accesstoken` table, keyed by the
//! token's public identifier (`resource->>'tokenId'`). The row's `txid` is the
//! record version: every write bumps it, and [`TokenRecordStore::update`] only
//! writes when `txid` still holds the value that was read.

use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use time::OffsetDateTime;
use uuid::Uuid;

use tokenbridge_auth::types::TokenRecord;

use crate::{PgPool, ResourceTuple, StorageError, StorageResult};

// =============================================================================
// Types
// =============================================================================

/// Access token row from database.
#[derive(Debug, Clone)]
pub struct TokenRecordRow {
    /// Row UUID
    pub id: Uuid,
    /// Transaction ID (version)
    pub txid: i64,
    /// Timestamp
    pub ts: OffsetDateTime,
    /// Full token record as JSONB
    pub resource: serde_json::Value,
    /// Row status (created, updated, deleted)
    pub status: String,
}

impl TokenRecordRow {
    /// Create from database tuple.
    fn from_tuple(row: ResourceTuple) -> Self {
        Self {
            id: row.0,
            txid: row.1,
            ts: row.2,
            resource: row.3,
            status: row.4,
        }
    }

    /// Decodes the token record, taking its version from `txid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource does not deserialize.
    pub fn into_record(self) -> StorageResult<TokenRecord> {
        let mut record: TokenRecord = serde_json::from_value(self.resource)?;
        record.version = self.txid;
        Ok(record)
    }
}

/// Serializes a record for the `resource` column. The version lives in `txid`.
fn to_resource(record: &TokenRecord) -> StorageResult<serde_json::Value> {
    let mut resource = serde_json::to_value(record)?;
    if let Some(object) = resource.as_object_mut() {
        object.remove("version");
    }
    Ok(resource)
}

// =============================================================================
// Token Record Store
// =============================================================================

/// Access token record operations.
pub struct TokenRecordStore<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenRecordStore<'a> {
    /// Create a new store with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a record by the access token's public identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_token_id(&self, token_id: &str) -> StorageResult<Option<TokenRecordRow>> {
        let row: Option<ResourceTuple> = query_as(
            r#"
            SELECT id, txid, ts, resource, status
            FROM accesstoken
            WHERE resource->>'tokenId' = $1
              AND status != 'deleted'
            "#,
        )
        .bind(token_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(TokenRecordRow::from_tuple))
    }

    /// Insert the record of a freshly issued access token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the token identifier is taken.
    pub async fn create(&self, record: &TokenRecord) -> StorageResult<TokenRecordRow> {
        let resource = to_resource(record)?;

        let row: ResourceTuple = query_as(
            r#"
            INSERT INTO accesstoken (id, txid, ts, resource, status)
            VALUES ($1, 1, NOW(), $2, 'created')
            RETURNING id, txid, ts, resource, status
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&resource)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx_core::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StorageError::conflict(format!(
                    "AccessToken '{}' already exists",
                    record.token_id
                ));
            }
            StorageError::from(e)
        })?;

        Ok(TokenRecordRow::from_tuple(row))
    }

    /// Replace a record if its `txid` still equals `record.version`.
    ///
    /// # Errors
    ///
    /// - `StorageError::NotFound` if no record exists for the identifier
    /// - `StorageError::Conflict` if another writer bumped `txid` first
    pub async fn update(&self, record: &TokenRecord) -> StorageResult<TokenRecordRow> {
        let resource = to_resource(record)?;

        let row: Option<ResourceTuple> = query_as(
            r#"
            UPDATE accesstoken
            SET resource = $2,
                txid = txid + 1,
                ts = NOW(),
                status = 'updated'
            WHERE resource->>'tokenId' = $1
              AND txid = $3
              AND status != 'deleted'
            RETURNING id, txid, ts, resource, status
            "#,
        )
        .bind(&record.token_id)
        .bind(&resource)
        .bind(record.version)
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(TokenRecordRow::from_tuple(row));
        }

        let current: Option<i64> = query_scalar(
            r#"
            SELECT txid
            FROM accesstoken
            WHERE resource->>'tokenId' = $1
              AND status != 'deleted'
            "#,
        )
        .bind(&record.token_id)
        .fetch_optional(self.pool)
        .await?;

        Err(match current {
            Some(txid) => StorageError::conflict(format!(
                "AccessToken '{}' was modified concurrently (expected txid {}, found {})",
                record.token_id, record.version, txid
            )),
            None => StorageError::not_found(format!("AccessToken {}", record.token_id)),
        })
    }
}
