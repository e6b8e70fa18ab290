//! User lookup for Google sign-in.
//!
//! Users live in the `"user"` table. A Google profile matches a user by the
//! linked Google account id (`resource->>'googleId'`) first, then by email
//! address, compared case-insensitively. Users marked `"active": false` never
//! match.

use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;

use tokenbridge_auth::types::UserIdentity;

use crate::{PgPool, ResourceTuple, StorageResult};

// =============================================================================
// Types
// =============================================================================

/// User record from database.
#[derive(Debug, Clone)]
pub struct UserRow {
    /// User UUID
    pub id: Uuid,
    /// Transaction ID (version)
    pub txid: i64,
    /// Timestamp
    pub ts: OffsetDateTime,
    /// Full user resource as JSONB
    pub resource: serde_json::Value,
    /// Row status (created, updated, deleted)
    pub status: String,
}

impl UserRow {
    fn from_tuple(row: ResourceTuple) -> Self {
        Self {
            id: row.0,
            txid: row.1,
            ts: row.2,
            resource: row.3,
            status: row.4,
        }
    }

    /// Projects the row onto the identity handed to grants.
    #[must_use]
    pub fn to_identity(&self) -> UserIdentity {
        let field = |name: &str| {
            self.resource
                .get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        UserIdentity {
            id: self.id.to_string(),
            email: field("email"),
            name: field("name"),
        }
    }
}

// =============================================================================
// User Store
// =============================================================================

/// User lookup operations.
pub struct UserStore<'a> {
    pool: &'a PgPool,
}

impl<'a> UserStore<'a> {
    /// Create a new store with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find an active user linked to a Google account id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_google_id(&self, google_id: &str) -> StorageResult<Option<UserRow>> {
        let row: Option<ResourceTuple> = query_as(
            r#"
            SELECT id, txid, ts, resource, status
            FROM "user"
            WHERE resource->>'googleId' = $1
              AND COALESCE(resource->>'active', 'true') != 'false'
              AND status != 'deleted'
            "#,
        )
        .bind(google_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(UserRow::from_tuple))
    }

    /// Find an active user by email, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> StorageResult<Option<UserRow>> {
        let row: Option<ResourceTuple> = query_as(
            r#"
            SELECT id, txid, ts, resource, status
            FROM "user"
            WHERE lower(resource->>'email') = lower($1)
              AND COALESCE(resource->>'active', 'true') != 'false'
              AND status != 'deleted'
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(UserRow::from_tuple))
    }
}
