//! Error types for identity bridge operations.

/// Errors raised while turning a third-party token into a profile.
///
/// A grant never shows these to the client; they are logged and normalized.
#[derive(Debug, thiserror::Error)]
pub enum IdpError {
    /// A network error occurred.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Identity provider returned HTTP {0}")]
    HttpStatus(u16),

    /// The provider response could not be parsed.
    #[error("Failed to parse identity provider response: {0}")]
    ParseError(String),

    /// The audience in the ID token doesn't match any configured client ID.
    #[error("Audience mismatch: ID token audience is not an accepted client ID")]
    AudienceMismatch,

    /// The issuer in the ID token is not Google.
    #[error("Issuer mismatch: expected {expected}, got {actual}")]
    IssuerMismatch {
        /// The expected issuer.
        expected: String,
        /// The actual issuer from the ID token.
        actual: String,
    },

    /// Mapping the profile to a local user failed.
    #[error("User lookup failed: {0}")]
    UserLookupFailed(String),

    /// The bridge could not be constructed.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl IdpError {
    /// Creates an `IssuerMismatch` error.
    #[must_use]
    pub fn issuer_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::IssuerMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Returns `true` if this is a token validation error.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::AudienceMismatch | Self::IssuerMismatch { .. })
    }

    /// Returns `true` if this is a network or external service error.
    #[must_use]
    pub fn is_external_error(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_) | Self::HttpStatus(_) | Self::ParseError(_)
        )
    }
}
