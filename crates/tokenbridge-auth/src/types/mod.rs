//! Common types used across the authentication modules.
//!
//! ## Domain Types
//!
//! - [`Client`] - OAuth 2.0 client registration
//! - [`Scope`] - Named permission unit
//! - [`UserIdentity`] - User resolved for one exchange
//! - [`AccessToken`] / [`TokenRecord`] - Issued access token and its persisted form
//! - [`RefreshToken`] - Refresh token record

pub mod access_token;
pub mod client;
pub mod refresh_token;
pub mod scope;
pub mod user;

pub use access_token::{AccessToken, IssuedRefreshToken, TokenRecord};
pub use client::{Client, ClientValidationError};
pub use refresh_token::RefreshToken;
pub use scope::{Scope, format_scopes, parse_scope_list};
pub use user::UserIdentity;
