//! Wires the grant engine from configuration.
//!
//! Clients and scopes always come from the config file. Token records,
//! refresh tokens and users live in PostgreSQL when `storage.postgres` is set,
//! in memory otherwise.

use std::sync::Arc;

use anyhow::Context;
use tokenbridge_auth::prelude::*;
use tokenbridge_auth_postgres::PostgresAuthStorage;
use tracing::{info, warn};

use crate::config::AppConfig;

/// Storage handles the grant engine runs against.
pub struct Storages {
    pub token_records: Arc<dyn TokenRecordStorage>,
    pub refresh_tokens: Arc<dyn RefreshTokenStorage>,
    pub users: Arc<dyn UserDirectory>,
}

impl Storages {
    /// In-memory storage with the configured users.
    pub async fn in_memory(cfg: &AppConfig) -> Self {
        let users = InMemoryUserDirectory::new();
        for entry in &cfg.users {
            users.insert(entry.to_identity()).await;
        }

        Self {
            token_records: Arc::new(InMemoryTokenRecordStorage::new()),
            refresh_tokens: Arc::new(InMemoryRefreshTokenStorage::new()),
            users: Arc::new(users),
        }
    }

    /// Connects to the configured backend.
    pub async fn connect(cfg: &AppConfig) -> anyhow::Result<Self> {
        let Some(pg) = &cfg.storage.postgres else {
            warn!("No storage.postgres configured; issued tokens are kept in memory");
            return Ok(Self::in_memory(cfg).await);
        };

        let storage = PostgresAuthStorage::connect(&pg.url)
            .await
            .context("connecting to PostgreSQL")?;
        if pg.ensure_schema {
            storage
                .ensure_schema()
                .await
                .context("creating auth tables")?;
        }
        if !cfg.users.is_empty() {
            warn!(
                count = cfg.users.len(),
                "Ignoring configured users; the PostgreSQL user table is authoritative"
            );
        }
        info!("Using PostgreSQL auth storage");

        Ok(Self {
            token_records: Arc::new(storage.token_record_storage()),
            refresh_tokens: Arc::new(storage.refresh_token_storage()),
            users: Arc::new(storage.user_directory()),
        })
    }
}

/// Builds the scope registry from the `[scopes]` section.
pub fn scope_storage(cfg: &AppConfig) -> InMemoryScopeStorage {
    cfg.scopes
        .registered
        .iter()
        .fold(InMemoryScopeStorage::new(), |scopes, entry| {
            scopes.with_grant_scope(entry.name.clone(), entry.grant_types.iter().cloned())
        })
        .with_default_scopes(cfg.scopes.default.iter().cloned())
}

/// Builds the token endpoint state over `storages`, using Google as the
/// identity bridge.
pub fn token_state(cfg: &AppConfig, storages: Storages) -> anyhow::Result<TokenState> {
    let bridge = GoogleIdentityBridge::new(cfg.auth.google.clone(), Arc::clone(&storages.users))
        .context("creating Google identity bridge")?;
    token_state_with_bridge(cfg, storages, Arc::new(bridge))
}

/// Builds the token endpoint state with an explicit identity bridge.
pub fn token_state_with_bridge(
    cfg: &AppConfig,
    storages: Storages,
    bridge: Arc<dyn IdentityBridge>,
) -> anyhow::Result<TokenState> {
    let clients = InMemoryClientStorage::with_clients(cfg.clients.iter().map(|c| c.to_client()));
    let issuer = OpaqueTokenIssuer::new(storages.token_records, storages.refresh_tokens);
    let events = Arc::new(TracingEventEmitter::new());

    let grant = GoogleAccessTokenGrant::new(
        Arc::new(clients),
        Arc::new(scope_storage(cfg)),
        Arc::new(issuer),
        bridge,
        events.clone(),
        events,
    )
    .with_login_channel(cfg.auth.login_channel.clone());

    let registry = GrantRegistry::new().with_grant(Arc::new(grant));
    info!(grants = ?registry.identifiers(), "Grant registry ready");

    Ok(TokenState::from_config(registry, &cfg.auth.oauth)?)
}
