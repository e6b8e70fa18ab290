//! Authentication and authorization error types.
//!
//! This module defines all error types that can occur while a grant exchanges
//! credentials for tokens, and while token records are augmented afterwards.

/// Errors that can occur during token exchange and token record operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request is missing a required parameter or the parameter is unusable.
    #[error("Invalid request: missing or invalid parameter '{parameter}'")]
    InvalidRequest {
        /// Name of the offending request parameter.
        parameter: String,
    },

    /// The client is not registered.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The requested scope is unknown or not permitted for the grant.
    #[error("Invalid scope: {scope}")]
    InvalidScope {
        /// The rejected scope name.
        scope: String,
    },

    /// The presented user credentials did not resolve to a user.
    #[error("The user credentials were incorrect")]
    InvalidCredentials,

    /// The authorization server does not support the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// A persisted record was not found.
    #[error("Not found: {resource}")]
    NotFound {
        /// Description of the missing resource.
        resource: String,
    },

    /// A concurrent writer changed a record between read and write.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflict.
        message: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidRequest` error naming the offending parameter.
    #[must_use]
    pub fn invalid_request(parameter: impl Into<String>) -> Self {
        Self::InvalidRequest {
            parameter: parameter.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope(scope: impl Into<String>) -> Self {
        Self::InvalidScope {
            scope: scope.into(),
        }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest { .. }
                | Self::InvalidClient { .. }
                | Self::InvalidScope { .. }
                | Self::InvalidCredentials
                | Self::UnsupportedGrantType { .. }
                | Self::NotFound { .. }
                | Self::Conflict { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. }
        )
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::InvalidCredentials => "invalid_grant",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. }
            | Self::Storage { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest { .. }
            | Self::InvalidScope { .. }
            | Self::UnsupportedGrantType { .. } => 400,
            Self::InvalidClient { .. } | Self::InvalidCredentials => 401,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. } => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::invalid_request("client_id");
        assert_eq!(
            err.to_string(),
            "Invalid request: missing or invalid parameter 'client_id'"
        );

        let err = AuthError::invalid_scope("admin");
        assert_eq!(err.to_string(), "Invalid scope: admin");

        let err = AuthError::InvalidCredentials;
        assert_eq!(err.to_string(), "The user credentials were incorrect");
    }

    #[test]
    fn test_error_predicates() {
        let err = AuthError::invalid_client("unknown");
        assert!(err.is_client_error());
        assert!(!err.is_server_error());

        let err = AuthError::InvalidCredentials;
        assert!(err.is_client_error());

        let err = AuthError::invalid_request("token");
        assert!(err.is_client_error());

        let err = AuthError::storage("database down");
        assert!(!err.is_client_error());
        assert!(err.is_server_error());
    }

    #[test]
    fn test_credentials_and_request_errors_are_distinguishable() {
        let request = AuthError::invalid_request("token");
        let credentials = AuthError::InvalidCredentials;

        assert_eq!(request.oauth_error_code(), "invalid_request");
        assert_eq!(credentials.oauth_error_code(), "invalid_grant");
        assert_eq!(request.http_status(), 400);
        assert_eq!(credentials.http_status(), 401);
    }

    #[test]
    fn test_http_status() {
        assert_eq!(AuthError::invalid_client("x").http_status(), 401);
        assert_eq!(AuthError::invalid_scope("x").http_status(), 400);
        assert_eq!(AuthError::not_found("x").http_status(), 404);
        assert_eq!(AuthError::unsupported_grant_type("x").http_status(), 400);
        assert_eq!(AuthError::internal("x").http_status(), 500);
    }
}
