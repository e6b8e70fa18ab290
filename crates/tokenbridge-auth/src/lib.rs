//! # tokenbridge-auth
//!
//! OAuth 2.0 token exchange for third-party identity tokens.
//!
//! This crate provides:
//! - The `google_access_token` grant, which trades a Google access token for
//!   this server's own access and refresh tokens
//! - The grant engine contracts it depends on (client lookup, scope
//!   finalization, token issuance, event emission)
//! - The Google identity bridge
//! - Token record storage, including stamping an acting user onto an issued token
//! - An axum handler for the token endpoint
//!
//! ## Modules
//!
//! - [`config`] - Authentication configuration
//! - [`oauth`] - Token requests, grant dispatch, the Google access token grant
//! - [`token`] - Access and refresh token issuance
//! - [`federation`] - Google identity bridge
//! - [`audit`] - Security event emission
//! - [`storage`] - Storage traits and in-memory backends
//! - [`http`] - Axum HTTP handlers
//! - [`types`] - Clients, scopes, users, tokens

pub mod audit;
pub mod config;
pub mod error;
pub mod federation;
pub mod http;
pub mod oauth;
pub mod storage;
pub mod token;
pub mod types;

pub use audit::{EventEmitter, LoginNotifier, RequestEvent, RequestEventKind, TracingEventEmitter};
pub use config::{AuthConfig, ConfigError, GoogleConfig, OAuthConfig};
pub use error::AuthError;
pub use federation::{GoogleIdentityBridge, GoogleProfile, IdentityBridge, IdpError, UserDirectory};
pub use http::{TokenState, token_handler};
pub use oauth::{
    BearerTokenResponse, GRANT_IDENTIFIER, GoogleAccessTokenGrant, Grant, GrantRegistry,
    REFRESH_TOKEN_TTL, TokenRequest, TokenResponse,
};
pub use storage::{ClientStorage, RefreshTokenStorage, ScopeStorage, TokenRecordStorage};
pub use token::{CalendarMonths, OpaqueTokenIssuer, TokenIssuer};
pub use types::{AccessToken, Client, RefreshToken, Scope, TokenRecord, UserIdentity};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tokenbridge_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::audit::{EventEmitter, LoginNotifier, TracingEventEmitter};
    pub use crate::config::AuthConfig;
    pub use crate::error::AuthError;
    pub use crate::federation::{GoogleIdentityBridge, IdentityBridge, UserDirectory};
    pub use crate::http::{TokenState, token_handler};
    pub use crate::oauth::{GoogleAccessTokenGrant, Grant, GrantRegistry, TokenRequest};
    pub use crate::storage::{
        ClientStorage, InMemoryClientStorage, InMemoryRefreshTokenStorage, InMemoryScopeStorage,
        InMemoryTokenRecordStorage, InMemoryUserDirectory, RefreshTokenStorage, ScopeStorage,
        TokenRecordStorage,
    };
    pub use crate::token::{CalendarMonths, OpaqueTokenIssuer, TokenIssuer};
    pub use crate::types::{Client, Scope, UserIdentity};
}
