//! HTTP handlers for OAuth 2.0 endpoints.
//!
//! # Available Handlers
//!
//! - [`token`] - Token endpoint (grant dispatch)

pub mod token;

pub use token::{TokenState, token_handler};
