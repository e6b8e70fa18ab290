//! Access and refresh token issuance.
//!
//! [`TokenIssuer`] is the engine capability grants mint tokens through.
//! [`OpaqueTokenIssuer`] produces random bearer strings and persists a
//! [`TokenRecord`] per access token and a hashed [`RefreshToken`] per
//! refresh token.

use std::sync::Arc;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::{RefreshTokenStorage, TokenRecordStorage};
use crate::token::CalendarMonths;
use crate::types::{AccessToken, Client, IssuedRefreshToken, RefreshToken, Scope, TokenRecord};

/// Attempts made to find an unused token identifier before giving up.
pub const MAX_GENERATION_ATTEMPTS: usize = 10;

/// Mints tokens on behalf of grants.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Issues and persists an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be persisted.
    async fn issue_access_token(
        &self,
        ttl: Duration,
        client: &Client,
        user_id: &str,
        scopes: &[Scope],
    ) -> AuthResult<AccessToken>;

    /// Issues and persists a refresh token bound to `access_token`, expiring
    /// `lifetime` after the moment of issue.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be persisted.
    async fn issue_refresh_token(
        &self,
        access_token: &AccessToken,
        lifetime: CalendarMonths,
    ) -> AuthResult<IssuedRefreshToken>;

    /// Marks a previously issued access token as revoked.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotFound`] if the token was never persisted, or a
    /// storage error.
    async fn revoke_access_token(&self, access_token: &AccessToken) -> AuthResult<()>;
}

/// Issues random opaque tokens.
pub struct OpaqueTokenIssuer {
    records: Arc<dyn TokenRecordStorage>,
    refresh_tokens: Arc<dyn RefreshTokenStorage>,
}

impl OpaqueTokenIssuer {
    /// Creates an issuer over the given stores.
    #[must_use]
    pub fn new(
        records: Arc<dyn TokenRecordStorage>,
        refresh_tokens: Arc<dyn RefreshTokenStorage>,
    ) -> Self {
        Self {
            records,
            refresh_tokens,
        }
    }
}

/// Public identifier for a token record: 40 hex characters.
fn generate_identifier() -> String {
    let mut bytes = [0u8; 20];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    hex::encode(bytes)
}

fn exhausted() -> AuthError {
    AuthError::internal(format!(
        "Could not generate a unique token identifier after {MAX_GENERATION_ATTEMPTS} attempts"
    ))
}

#[async_trait]
impl TokenIssuer for OpaqueTokenIssuer {
    async fn issue_access_token(
        &self,
        ttl: Duration,
        client: &Client,
        user_id: &str,
        scopes: &[Scope],
    ) -> AuthResult<AccessToken> {
        let expires_at = OffsetDateTime::now_utc() + ttl;

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let token = AccessToken {
                identifier: generate_identifier(),
                value: RefreshToken::generate_token(),
                client_id: client.client_id.clone(),
                user_id: user_id.to_string(),
                scopes: scopes.to_vec(),
                expires_at,
            };
            let record = TokenRecord::from_access_token(&token, RefreshToken::hash_token(&token.value));

            match self.records.create(&record).await {
                Ok(()) => {
                    tracing::debug!(
                        token_id = %token.identifier,
                        client_id = %token.client_id,
                        user_id = %token.user_id,
                        "Issued access token"
                    );
                    return Ok(token);
                }
                Err(AuthError::Conflict { .. }) => {
                    tracing::debug!(attempt, "Access token identifier collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(exhausted())
    }

    async fn issue_refresh_token(
        &self,
        access_token: &AccessToken,
        lifetime: CalendarMonths,
    ) -> AuthResult<IssuedRefreshToken> {
        let now = OffsetDateTime::now_utc();
        let expires_at = lifetime.after(now)?;

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let value = RefreshToken::generate_token();
            let refresh_token = RefreshToken {
                id: Uuid::new_v4(),
                token_hash: RefreshToken::hash_token(&value),
                access_token_id: access_token.identifier.clone(),
                client_id: access_token.client_id.clone(),
                user_id: access_token.user_id.clone(),
                created_at: now,
                expires_at,
            };

            match self.refresh_tokens.create(&refresh_token).await {
                Ok(()) => {
                    tracing::debug!(
                        token_id = %access_token.identifier,
                        "Issued refresh token"
                    );
                    return Ok(IssuedRefreshToken {
                        value,
                        access_token_id: access_token.identifier.clone(),
                        expires_at: refresh_token.expires_at,
                    });
                }
                Err(AuthError::Conflict { .. }) => {
                    tracing::debug!(attempt, "Refresh token collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(exhausted())
    }

    async fn revoke_access_token(&self, access_token: &AccessToken) -> AuthResult<()> {
        self.records.revoke(&access_token.identifier).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryRefreshTokenStorage, InMemoryTokenRecordStorage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Token record store that reports a collision for the first `failures` writes.
    struct CollidingRecordStorage {
        inner: InMemoryTokenRecordStorage,
        failures: usize,
        calls: AtomicUsize,
    }

    impl CollidingRecordStorage {
        fn new(failures: usize) -> Self {
            Self {
                inner: InMemoryTokenRecordStorage::new(),
                failures,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TokenRecordStorage for CollidingRecordStorage {
        async fn create(&self, record: &TokenRecord) -> AuthResult<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(AuthError::conflict("duplicate token id"));
            }
            self.inner.create(record).await
        }

        async fn find_by_token_id(&self, token_id: &str) -> AuthResult<Option<TokenRecord>> {
            self.inner.find_by_token_id(token_id).await
        }

        async fn update(&self, record: &TokenRecord) -> AuthResult<TokenRecord> {
            self.inner.update(record).await
        }
    }

    fn client() -> Client {
        Client::new("mobile", "Mobile App")
    }

    #[tokio::test]
    async fn test_access_token_is_persisted() {
        let records = Arc::new(InMemoryTokenRecordStorage::new());
        let issuer = OpaqueTokenIssuer::new(
            records.clone(),
            Arc::new(InMemoryRefreshTokenStorage::new()),
        );

        let token = issuer
            .issue_access_token(Duration::hours(1), &client(), "42", &[Scope::new("profile")])
            .await
            .unwrap();

        assert_eq!(token.identifier.len(), 40);
        assert!(!token.value.is_empty());
        assert!(token.expires_in() > 3590);

        let record = records
            .find_by_token_id(&token.identifier)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.user_id, "42");
        assert_eq!(record.client_id, "mobile");
        assert_eq!(record.scopes, vec!["profile".to_string()]);
        assert_eq!(record.token_hash, RefreshToken::hash_token(&token.value));
        assert!(record.acting_user_id.is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_is_stored_hashed() {
        let refresh_tokens = Arc::new(InMemoryRefreshTokenStorage::new());
        let issuer = OpaqueTokenIssuer::new(
            Arc::new(InMemoryTokenRecordStorage::new()),
            refresh_tokens.clone(),
        );

        let access = issuer
            .issue_access_token(Duration::minutes(5), &client(), "42", &[])
            .await
            .unwrap();
        let refresh = issuer
            .issue_refresh_token(&access, CalendarMonths(1))
            .await
            .unwrap();

        assert_eq!(refresh.access_token_id, access.identifier);
        let stored = refresh_tokens
            .find_by_hash(&RefreshToken::hash_token(&refresh.value))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.access_token_id, access.identifier);
        assert_eq!(stored.expires_at, refresh.expires_at);
        assert_eq!(
            stored.expires_at,
            CalendarMonths(1).after(stored.created_at).unwrap()
        );
        assert_eq!(stored.user_id, "42");
    }

    #[tokio::test]
    async fn test_revoke_access_token_marks_record() {
        let records = Arc::new(InMemoryTokenRecordStorage::new());
        let issuer = OpaqueTokenIssuer::new(
            records.clone(),
            Arc::new(InMemoryRefreshTokenStorage::new()),
        );

        let access = issuer
            .issue_access_token(Duration::hours(1), &client(), "42", &[])
            .await
            .unwrap();
        issuer.revoke_access_token(&access).await.unwrap();

        let record = records
            .find_by_token_id(&access.identifier)
            .await
            .unwrap()
            .unwrap();
        assert!(record.revoked);
        assert_eq!(record.version, 2);
    }

    #[tokio::test]
    async fn test_identifier_collision_is_retried() {
        let records = Arc::new(CollidingRecordStorage::new(3));
        let issuer = OpaqueTokenIssuer::new(
            records.clone(),
            Arc::new(InMemoryRefreshTokenStorage::new()),
        );

        let token = issuer
            .issue_access_token(Duration::hours(1), &client(), "42", &[])
            .await
            .unwrap();

        assert_eq!(records.calls.load(Ordering::SeqCst), 4);
        assert!(records.find_by_token_id(&token.identifier).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let records = Arc::new(CollidingRecordStorage::new(usize::MAX));
        let issuer = OpaqueTokenIssuer::new(
            records.clone(),
            Arc::new(InMemoryRefreshTokenStorage::new()),
        );

        let err = issuer
            .issue_access_token(Duration::hours(1), &client(), "42", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Internal { .. }));
        assert_eq!(records.calls.load(Ordering::SeqCst), MAX_GENERATION_ATTEMPTS);
    }
}
