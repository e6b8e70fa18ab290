//! Token endpoint response types.
//!
//! Grants attach the tokens they mint to a [`BearerTokenResponse`]; the HTTP
//! layer renders it as a [`TokenResponse`] body, or renders a failure as a
//! [`TokenError`].
//!
//! # Example Response
//!
//! ```json
//! {
//!   "access_token": "q0XgWk...",
//!   "token_type": "Bearer",
//!   "expires_in": 3600,
//!   "refresh_token": "Hd8tT1...",
//!   "scope": "profile email"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::AuthResult;
use crate::error::AuthError;
use crate::types::{AccessToken, IssuedRefreshToken, format_scopes};

/// Successful token response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Refresh token, if one was issued.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Granted scopes (space-separated), omitted when none were granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Response builder handed to grants.
///
/// Holds what the grant attached; nothing else about the response is
/// decided by the grant.
#[derive(Debug, Default)]
pub struct BearerTokenResponse {
    access_token: Option<AccessToken>,
    refresh_token: Option<IssuedRefreshToken>,
}

impl BearerTokenResponse {
    /// Creates an empty response builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the access token.
    pub fn set_access_token(&mut self, token: AccessToken) {
        self.access_token = Some(token);
    }

    /// Attaches the refresh token.
    pub fn set_refresh_token(&mut self, token: IssuedRefreshToken) {
        self.refresh_token = Some(token);
    }

    /// The attached access token.
    #[must_use]
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    /// The attached refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&IssuedRefreshToken> {
        self.refresh_token.as_ref()
    }

    /// Renders the response body.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if no access token was attached.
    pub fn into_response_body(self) -> AuthResult<TokenResponse> {
        let access_token = self
            .access_token
            .ok_or_else(|| AuthError::internal("Grant completed without an access token"))?;

        let scope = format_scopes(&access_token.scopes);

        Ok(TokenResponse {
            expires_in: access_token.expires_in(),
            access_token: access_token.value,
            token_type: "Bearer".to_string(),
            refresh_token: self.refresh_token.map(|t| t.value),
            scope: (!scope.is_empty()).then_some(scope),
        })
    }
}

/// Token error response body.
///
/// ```json
/// {
///   "error": "invalid_request",
///   "error_description": "Invalid request: missing or invalid parameter 'token'"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct TokenError {
    /// OAuth 2.0 error code.
    pub error: TokenErrorCode,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl TokenError {
    /// Creates a new token error.
    #[must_use]
    pub fn new(error: TokenErrorCode) -> Self {
        Self {
            error,
            error_description: None,
        }
    }

    /// Creates a new token error with description.
    #[must_use]
    pub fn with_description(error: TokenErrorCode, description: impl Into<String>) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
        }
    }
}

impl From<&AuthError> for TokenError {
    fn from(err: &AuthError) -> Self {
        let code = TokenErrorCode::from(err);
        if code == TokenErrorCode::ServerError {
            // Internal details stay in the logs.
            Self::with_description(code, "The authorization server encountered an unexpected error")
        } else {
            Self::with_description(code, err.to_string())
        }
    }
}

/// OAuth 2.0 token error codes.
///
/// Defined in RFC 6749 Section 5.2, plus `server_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenErrorCode {
    /// The request is missing a required parameter or is otherwise malformed.
    InvalidRequest,

    /// Client authentication failed.
    InvalidClient,

    /// The presented grant or user credential is invalid.
    InvalidGrant,

    /// The authorization grant type is not supported by the authorization server.
    UnsupportedGrantType,

    /// The requested scope is invalid or unknown.
    InvalidScope,

    /// The server failed while handling the request.
    ServerError,
}

impl TokenErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
        }
    }
}

impl From<&AuthError> for TokenErrorCode {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::InvalidRequest { .. } => Self::InvalidRequest,
            AuthError::InvalidClient { .. } => Self::InvalidClient,
            AuthError::InvalidCredentials => Self::InvalidGrant,
            AuthError::InvalidScope { .. } => Self::InvalidScope,
            AuthError::UnsupportedGrantType { .. } => Self::UnsupportedGrantType,
            AuthError::NotFound { .. }
            | AuthError::Conflict { .. }
            | AuthError::Storage { .. }
            | AuthError::Configuration { .. }
            | AuthError::Internal { .. } => Self::ServerError,
        }
    }
}

impl fmt::Display for TokenErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
