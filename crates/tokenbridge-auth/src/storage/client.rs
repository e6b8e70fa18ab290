//! Client storage trait.
//!
//! Defines the client lookup capability grants depend on.
//! Implementations are provided by storage backends.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Client;

// =============================================================================
// Client Storage Trait
// =============================================================================

/// Lookup operations for OAuth 2.0 clients.
///
/// # Example
///
/// ```ignore
/// use tokenbridge_auth::storage::ClientStorage;
///
/// async fn example(storage: &impl ClientStorage) {
///     if let Some(client) = storage.find_by_client_id("my-app").await? {
///         println!("Found client: {}", client.name);
///     }
/// }
/// ```
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Find a client by its OAuth client_id.
    ///
    /// Returns `None` if the client doesn't exist or is not active.
    /// No secret is checked here; secret verification belongs to the grants
    /// that require it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>>;
}
