//! In-memory storage backends.
//!
//! Used for tests, for embedding without a database, and for the static
//! client and scope registries the server seeds from configuration.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::AuthResult;
use crate::error::AuthError;
use crate::federation::google::{GoogleProfile, UserDirectory};
use crate::storage::{ClientStorage, RefreshTokenStorage, ScopeStorage, TokenRecordStorage};
use crate::types::{Client, RefreshToken, Scope, TokenRecord, UserIdentity};

// =============================================================================
// Clients
// =============================================================================

/// Client registry held in memory.
#[derive(Default)]
pub struct InMemoryClientStorage {
    clients: RwLock<HashMap<String, Client>>,
}

impl InMemoryClientStorage {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded with `clients`.
    #[must_use]
    pub fn with_clients(clients: impl IntoIterator<Item = Client>) -> Self {
        let clients = clients
            .into_iter()
            .map(|c| (c.client_id.clone(), c))
            .collect();
        Self {
            clients: RwLock::new(clients),
        }
    }

    /// Registers or replaces a client.
    pub async fn insert(&self, client: Client) {
        self.clients
            .write()
            .await
            .insert(client.client_id.clone(), client);
    }
}

#[async_trait]
impl ClientStorage for InMemoryClientStorage {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self
            .clients
            .read()
            .await
            .get(client_id)
            .filter(|c| c.active)
            .cloned())
    }
}

// =============================================================================
// Scopes
// =============================================================================

/// Scope registry held in memory.
///
/// A scope registered with an empty grant list is permitted for every grant.
#[derive(Default)]
pub struct InMemoryScopeStorage {
    scopes: HashMap<String, Vec<String>>,
    default_scopes: Vec<String>,
}

impl InMemoryScopeStorage {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scope permitted for every grant.
    #[must_use]
    pub fn with_scope(mut self, name: impl Into<String>) -> Self {
        self.scopes.insert(name.into(), Vec::new());
        self
    }

    /// Registers a scope permitted only for the listed grants.
    #[must_use]
    pub fn with_grant_scope<I, S>(mut self, name: impl Into<String>, grant_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes.insert(
            name.into(),
            grant_types.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Sets the scopes granted when a request names none.
    #[must_use]
    pub fn with_default_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl ScopeStorage for InMemoryScopeStorage {
    async fn find_scope(&self, name: &str, grant_type: &str) -> AuthResult<Option<Scope>> {
        Ok(self.scopes.get(name).and_then(|grants| {
            (grants.is_empty() || grants.iter().any(|g| g == grant_type)).then(|| Scope::new(name))
        }))
    }

    async fn finalize_scopes(
        &self,
        scopes: Vec<Scope>,
        _grant_type: &str,
        client: &Client,
        _user_id: &str,
    ) -> AuthResult<Vec<Scope>> {
        let requested = if scopes.is_empty() {
            self.default_scopes.iter().map(Scope::new).collect()
        } else {
            scopes
        };

        Ok(requested
            .into_iter()
            .filter(|s| client.is_scope_allowed(s.as_str()))
            .collect())
    }
}

// =============================================================================
// Token Records
// =============================================================================

/// Access token records held in memory.
///
/// Updates take the write lock for the whole compare-and-swap, which makes the
/// version check and the write a single step.
#[derive(Default)]
pub struct InMemoryTokenRecordStorage {
    records: RwLock<HashMap<String, TokenRecord>>,
}

impl InMemoryTokenRecordStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns `true` when no record is stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl TokenRecordStorage for InMemoryTokenRecordStorage {
    async fn create(&self, record: &TokenRecord) -> AuthResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.token_id) {
            return Err(AuthError::conflict(format!(
                "Access token {} already exists",
                record.token_id
            )));
        }
        records.insert(record.token_id.clone(), record.clone());
        Ok(())
    }

    async fn find_by_token_id(&self, token_id: &str) -> AuthResult<Option<TokenRecord>> {
        Ok(self.records.read().await.get(token_id).cloned())
    }

    async fn update(&self, record: &TokenRecord) -> AuthResult<TokenRecord> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&record.token_id)
            .ok_or_else(|| AuthError::not_found(format!("Access token {}", record.token_id)))?;

        if stored.version != record.version {
            return Err(AuthError::conflict(format!(
                "Access token {} was modified concurrently (expected version {}, found {})",
                record.token_id, record.version, stored.version
            )));
        }

        let mut updated = record.clone();
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }
}

// =============================================================================
// Refresh Tokens
// =============================================================================

/// Refresh tokens held in memory, keyed by hash.
#[derive(Default)]
pub struct InMemoryRefreshTokenStorage {
    tokens: RwLock<HashMap<String, RefreshToken>>,
}

impl InMemoryRefreshTokenStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStorage for InMemoryRefreshTokenStorage {
    async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&token.token_hash) {
            return Err(AuthError::conflict("Refresh token hash already exists"));
        }
        tokens.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>> {
        Ok(self.tokens.read().await.get(token_hash).cloned())
    }
}

// =============================================================================
// Users
// =============================================================================

/// User directory keyed by email address (case-insensitive).
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<String, UserIdentity>>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user; users without an email are not reachable through Google.
    pub async fn insert(&self, user: UserIdentity) {
        if let Some(email) = &user.email {
            self.users
                .write()
                .await
                .insert(email.to_ascii_lowercase(), user);
        }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_google_profile(
        &self,
        profile: &GoogleProfile,
    ) -> AuthResult<Option<UserIdentity>> {
        let Some(email) = profile.email.as_deref() else {
            return Ok(None);
        };
        Ok(self
            .users
            .read()
            .await
            .get(&email.to_ascii_lowercase())
            .cloned())
    }
}
