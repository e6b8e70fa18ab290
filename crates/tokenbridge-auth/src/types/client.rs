//! OAuth 2.0 Client domain types.
//!
//! A client is looked up by the grants, never mutated by them. Clients of the
//! Google grant are public: no secret is stored or checked.

use serde::{Deserialize, Serialize};

// =============================================================================
// Client
// =============================================================================

/// OAuth 2.0 Client registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    /// Human-readable display name.
    pub name: String,

    /// OAuth scopes this client is allowed to request.
    /// Empty list means all scopes are allowed.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Whether this client is currently active and can be used.
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Client {
    /// Creates an active client with no scope restriction.
    #[must_use]
    pub fn new(client_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            name: name.into(),
            scopes: Vec::new(),
            active: true,
        }
    }

    /// Restricts the scopes this client may request.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Validates the client registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier or the name is empty.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.name.is_empty() {
            return Err(ClientValidationError::EmptyName);
        }

        Ok(())
    }

    /// Checks if the given scope is allowed for this client.
    ///
    /// An empty scopes list means all scopes are allowed.
    #[must_use]
    pub fn is_scope_allowed(&self, scope: &str) -> bool {
        self.scopes.is_empty() || self.scopes.iter().any(|allowed| allowed == scope)
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Errors that can occur during client validation.
#[derive(Debug, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// Client name cannot be empty.
    #[error("Client name cannot be empty")]
    EmptyName,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_client() {
        let client = Client::new("mobile-app", "Mobile App");
        assert!(client.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_client_id() {
        let client = Client::new("", "Mobile App");
        assert!(matches!(
            client.validate(),
            Err(ClientValidationError::EmptyClientId)
        ));
    }

    #[test]
    fn test_validate_empty_name() {
        let client = Client::new("mobile-app", "");
        assert!(matches!(
            client.validate(),
            Err(ClientValidationError::EmptyName)
        ));
    }

    #[test]
    fn test_scope_allowed() {
        let open = Client::new("a", "A");
        assert!(open.is_scope_allowed("anything"));

        let restricted = Client::new("b", "B").with_scopes(["profile", "email"]);
        assert!(restricted.is_scope_allowed("email"));
        assert!(!restricted.is_scope_allowed("admin"));
    }

    #[test]
    fn test_deserialize_defaults() {
        let client: Client =
            serde_json::from_str(r#"{"clientId":"web","name":"Web"}"#).unwrap();
        assert!(client.active);
        assert!(client.scopes.is_empty());
    }
}
