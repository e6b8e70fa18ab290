//! Access token and its persisted record.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::scope::Scope;

/// An access token as issued to a client.
///
/// `value` is the bearer credential handed to the client; `identifier` is the
/// public identifier under which the [`TokenRecord`] is persisted.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Public identifier of the token record.
    pub identifier: String,

    /// Bearer value returned to the client.
    pub value: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// User the token was issued for.
    pub user_id: String,

    /// Final granted scopes.
    pub scopes: Vec<Scope>,

    /// Expiry instant.
    pub expires_at: OffsetDateTime,
}

impl AccessToken {
    /// Seconds until expiry, clamped at zero.
    #[must_use]
    pub fn expires_in(&self) -> u64 {
        let remaining = (self.expires_at - OffsetDateTime::now_utc()).whole_seconds();
        u64::try_from(remaining).unwrap_or(0)
    }
}

/// A refresh token as issued to a client, alongside its stored record.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    /// Plaintext token value returned to the client.
    pub value: String,

    /// Public identifier of the access token this refresh token belongs to.
    pub access_token_id: String,

    /// Expiry instant.
    pub expires_at: OffsetDateTime,
}

/// Durable representation of an issued access token.
///
/// Keyed by the access token's public identifier. `acting_user_id` records the
/// user the token acts on behalf of, distinct from the token subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// Public identifier of the access token.
    pub token_id: String,

    /// SHA-256 hash of the bearer value.
    pub token_hash: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// Token subject.
    pub user_id: String,

    /// Granted scope names.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Auxiliary "acting-as" user identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acting_user_id: Option<String>,

    /// Whether the token has been revoked.
    #[serde(default)]
    pub revoked: bool,

    /// When the token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Record version, bumped on every write.
    #[serde(default)]
    pub version: i64,
}

impl TokenRecord {
    /// Builds the record persisted for a freshly issued access token.
    #[must_use]
    pub fn from_access_token(token: &AccessToken, token_hash: String) -> Self {
        Self {
            token_id: token.identifier.clone(),
            token_hash,
            client_id: token.client_id.clone(),
            user_id: token.user_id.clone(),
            scopes: token.scopes.iter().map(|s| s.as_str().to_string()).collect(),
            acting_user_id: None,
            revoked: false,
            created_at: OffsetDateTime::now_utc(),
            expires_at: token.expires_at,
            version: 1,
        }
    }
}
