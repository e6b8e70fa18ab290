//! OAuth 2.0 token endpoint engine.
//!
//! - [`request`] - token request parameters and Basic credentials
//! - [`token`] - response builder, response body and error body
//! - [`grant`] - the [`Grant`] contract and `grant_type` dispatch
//! - [`google_access_token`] - the Google access token grant
//!
//! # Example
//!
//! ```ignore
//! use tokenbridge_auth::oauth::{GoogleAccessTokenGrant, GrantRegistry, TokenRequest};
//!
//! let registry = GrantRegistry::new().with_grant(Arc::new(GoogleAccessTokenGrant::new(
//!     clients, scopes, issuer, bridge, emitter, notifier,
//! )));
//!
//! let request = TokenRequest::new(form).with_authorization_header(auth_header);
//! let response = registry
//!     .respond_to_access_token_request(&request, Duration::hours(1))
//!     .await?;
//! ```

pub mod google_access_token;
pub mod grant;
pub mod request;
pub mod token;

pub use google_access_token::{GRANT_IDENTIFIER, GoogleAccessTokenGrant, REFRESH_TOKEN_TTL};
pub use grant::{Grant, GrantRegistry};
pub use request::{BasicCredentials, TokenRequest, parse_basic_auth};
pub use token::{BearerTokenResponse, TokenError, TokenErrorCode, TokenResponse};
