//! Storage traits for auth-related data.
//!
//! This module defines storage interfaces for:
//!
//! - OAuth client registrations
//! - Scopes and scope finalization
//! - Access token records (including acting-user augmentation)
//! - Refresh tokens
//!
//! # Implementations
//!
//! - [`memory`] - in-memory backends
//! - `tokenbridge-auth-postgres` - PostgreSQL token record backend

pub mod client;
pub mod memory;
pub mod refresh_token;
pub mod scope;
pub mod token_record;

pub use client::ClientStorage;
pub use memory::{
    InMemoryClientStorage, InMemoryRefreshTokenStorage, InMemoryScopeStorage,
    InMemoryTokenRecordStorage, InMemoryUserDirectory,
};
pub use refresh_token::RefreshTokenStorage;
pub use scope::ScopeStorage;
pub use token_record::TokenRecordStorage;
