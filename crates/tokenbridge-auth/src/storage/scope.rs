//! Scope storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::{Client, Scope};

/// Scope lookup and finalization.
#[async_trait]
pub trait ScopeStorage: Send + Sync {
    /// Finds a scope by name.
    ///
    /// Returns `None` if the scope is unknown or not permitted for `grant_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_scope(&self, name: &str, grant_type: &str) -> AuthResult<Option<Scope>>;

    /// Produces the authoritative scope set for a token.
    ///
    /// Implementations may add or remove scopes by policy. Callers use the
    /// result as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn finalize_scopes(
        &self,
        scopes: Vec<Scope>,
        grant_type: &str,
        client: &Client,
        user_id: &str,
    ) -> AuthResult<Vec<Scope>>;
}
