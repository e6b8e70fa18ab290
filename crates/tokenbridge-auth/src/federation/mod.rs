//! External identity provider federation.
//!
//! - [`google`] - Google identity bridge (access token and ID token lookup)
//! - [`error`] - Identity bridge errors

pub mod error;
pub mod google;

pub use error::IdpError;
pub use google::{GoogleIdentityBridge, GoogleProfile, IdentityBridge, UserDirectory};
