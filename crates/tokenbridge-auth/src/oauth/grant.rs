//! Grant dispatch.
//!
//! Every grant registers under the `grant_type` string clients send to the
//! token endpoint. [`GrantRegistry`] routes a [`TokenRequest`] to the grant
//! registered under that string.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::Duration;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::request::TokenRequest;
use crate::oauth::token::BearerTokenResponse;

/// A strategy for exchanging some credential for tokens.
#[async_trait]
pub trait Grant: Send + Sync {
    /// Stable `grant_type` identifier.
    fn identifier(&self) -> &'static str;

    /// Handles one token request, attaching issued tokens to `response`.
    ///
    /// # Errors
    ///
    /// Returns the OAuth error the request failed with.
    async fn respond_to_access_token_request(
        &self,
        request: &TokenRequest,
        response: BearerTokenResponse,
        access_token_ttl: Duration,
    ) -> AuthResult<BearerTokenResponse>;
}

/// Maps `grant_type` identifiers to grants.
#[derive(Default, Clone)]
pub struct GrantRegistry {
    grants: HashMap<&'static str, Arc<dyn Grant>>,
}

impl GrantRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a grant under its identifier, replacing any previous one.
    #[must_use]
    pub fn with_grant(mut self, grant: Arc<dyn Grant>) -> Self {
        self.register(grant);
        self
    }

    /// Registers a grant under its identifier, replacing any previous one.
    pub fn register(&mut self, grant: Arc<dyn Grant>) {
        self.grants.insert(grant.identifier(), grant);
    }

    /// Returns the grant registered under `grant_type`.
    #[must_use]
    pub fn get(&self, grant_type: &str) -> Option<&Arc<dyn Grant>> {
        self.grants.get(grant_type)
    }

    /// Registered identifiers, sorted.
    #[must_use]
    pub fn identifiers(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.grants.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Dispatches `request` to the grant named by its `grant_type`.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest("grant_type")` if the parameter is missing
    /// - `UnsupportedGrantType` if no grant is registered under it
    /// - whatever the grant fails with
    pub async fn respond_to_access_token_request(
        &self,
        request: &TokenRequest,
        access_token_ttl: Duration,
    ) -> AuthResult<BearerTokenResponse> {
        let grant_type = request
            .grant_type()
            .ok_or_else(|| AuthError::invalid_request("grant_type"))?;

        let grant = self
            .get(grant_type)
            .ok_or_else(|| AuthError::unsupported_grant_type(grant_type))?;

        grant
            .respond_to_access_token_request(request, BearerTokenResponse::new(), access_token_ttl)
            .await
    }
}
