//! Google identity bridge.
//!
//! Turns a Google access token or ID token into a local [`UserIdentity`].
//! Google vouches for the token (userinfo / tokeninfo endpoints); the
//! [`UserDirectory`] decides which local user the profile belongs to.
//!
//! # Outcomes
//!
//! - `Err(_)`: the token could not be checked (network failure, rejected or
//!   expired token, malformed response, audience/issuer mismatch)
//! - `Ok(None)`: Google accepted the token but no local user matches
//! - `Ok(Some(user))`: resolved

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::AuthResult;
use crate::config::GoogleConfig;
use crate::federation::error::IdpError;
use crate::types::UserIdentity;

/// Issuers Google puts in ID tokens.
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

// =============================================================================
// Contracts
// =============================================================================

/// Resolves third-party tokens to local users.
#[async_trait]
pub trait IdentityBridge: Send + Sync {
    /// Looks up the user owning a provider access token.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a rejected token, or an
    /// unparseable provider response.
    async fn lookup_by_access_token(&self, token: &str) -> Result<Option<UserIdentity>, IdpError>;

    /// Looks up the user owning a provider ID token.
    ///
    /// # Errors
    ///
    /// As [`Self::lookup_by_access_token`], plus audience and issuer checks.
    async fn lookup_by_id_token(&self, token: &str) -> Result<Option<UserIdentity>, IdpError>;
}

/// Maps a verified Google profile to a local user.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Returns the local user for `profile`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_google_profile(
        &self,
        profile: &GoogleProfile,
    ) -> AuthResult<Option<UserIdentity>>;
}

// =============================================================================
// Profile
// =============================================================================

/// Profile fields shared by Google's userinfo and tokeninfo responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleProfile {
    /// Google account identifier.
    pub sub: String,

    /// Primary email address.
    #[serde(default)]
    pub email: Option<String>,

    /// Whether Google verified the email address.
    /// tokeninfo sends this as the string `"true"`.
    #[serde(default, deserialize_with = "bool_or_string")]
    pub email_verified: bool,

    /// Full name.
    #[serde(default)]
    pub name: Option<String>,

    /// Given name.
    #[serde(default)]
    pub given_name: Option<String>,

    /// Family name.
    #[serde(default)]
    pub family_name: Option<String>,

    /// Avatar URL.
    #[serde(default)]
    pub picture: Option<String>,

    /// Preferred locale.
    #[serde(default)]
    pub locale: Option<String>,

    /// Audience (tokeninfo only).
    #[serde(default)]
    pub aud: Option<String>,

    /// Issuer (tokeninfo only).
    #[serde(default)]
    pub iss: Option<String>,
}

fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrString {
        Bool(bool),
        String(String),
    }

    Ok(match Option::<BoolOrString>::deserialize(deserializer)? {
        Some(BoolOrString::Bool(value)) => value,
        Some(BoolOrString::String(value)) => value.eq_ignore_ascii_case("true"),
        None => false,
    })
}

// =============================================================================
// Google Bridge
// =============================================================================

/// [`IdentityBridge`] backed by Google's public endpoints.
pub struct GoogleIdentityBridge {
    http_client: reqwest::Client,
    config: GoogleConfig,
    users: Arc<dyn UserDirectory>,
}

impl GoogleIdentityBridge {
    /// Creates a bridge.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GoogleConfig, users: Arc<dyn UserDirectory>) -> Result<Self, IdpError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| IdpError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            config,
            users,
        })
    }

    async fn fetch_profile(&self, request: reqwest::RequestBuilder) -> Result<GoogleProfile, IdpError> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Google profile request failed"))?;

        if !response.status().is_success() {
            return Err(IdpError::HttpStatus(response.status().as_u16()));
        }

        response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Google profile");
            IdpError::ParseError(e.to_string())
        })
    }

    async fn resolve(&self, profile: GoogleProfile) -> Result<Option<UserIdentity>, IdpError> {
        if self.config.require_verified_email && !profile.email_verified {
            tracing::debug!(sub = %profile.sub, "Google profile email is not verified");
            return Ok(None);
        }

        self.users
            .find_by_google_profile(&profile)
            .await
            .map_err(|e| IdpError::UserLookupFailed(e.to_string()))
    }

    fn validate_id_token_claims(&self, profile: &GoogleProfile) -> Result<(), IdpError> {
        let issuer = profile.iss.as_deref().unwrap_or_default();
        if !GOOGLE_ISSUERS.contains(&issuer) {
            return Err(IdpError::issuer_mismatch(GOOGLE_ISSUERS[1], issuer));
        }

        if !self.config.client_ids.is_empty() {
            let audience = profile.aud.as_deref().unwrap_or_default();
            if !self.config.client_ids.iter().any(|id| id == audience) {
                return Err(IdpError::AudienceMismatch);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl IdentityBridge for GoogleIdentityBridge {
    async fn lookup_by_access_token(&self, token: &str) -> Result<Option<UserIdentity>, IdpError> {
        let request = self
            .http_client
            .get(&self.config.userinfo_endpoint)
            .bearer_auth(token);
        let profile = self.fetch_profile(request).await?;
        self.resolve(profile).await
    }

    async fn lookup_by_id_token(&self, token: &str) -> Result<Option<UserIdentity>, IdpError> {
        let request = self
            .http_client
            .get(&self.config.tokeninfo_endpoint)
            .query(&[("id_token", token)]);
        let profile = self.fetch_profile(request).await?;
        self.validate_id_token_claims(&profile)?;
        self.resolve(profile).await
    }
}
