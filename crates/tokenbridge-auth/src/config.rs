//! Authentication configuration.
//!
//! Token lifetimes, the Google identity bridge, and audit settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// login_channel = "api"
///
/// [auth.oauth]
/// access_token_lifetime = "1h"
///
/// [auth.google]
/// client_ids = ["1234.apps.googleusercontent.com"]
/// request_timeout = "10s"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth 2.0 configuration.
    pub oauth: OAuthConfig,

    /// Google identity bridge configuration.
    pub google: GoogleConfig,

    /// Channel name the login event is tagged with.
    pub login_channel: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            oauth: OAuthConfig::default(),
            google: GoogleConfig::default(),
            login_channel: "api".to_string(),
        }
    }
}

/// OAuth 2.0 configuration.
///
/// The Google grant's refresh-token lifetime is a fixed one-month policy and is
/// intentionally absent here.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Access token lifetime handed to grants by the token endpoint.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime: Duration::from_secs(3600), // 1 hour
        }
    }
}

/// Google identity bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// OpenID Connect userinfo endpoint, called with the access token.
    pub userinfo_endpoint: String,

    /// Token info endpoint, called with an ID token.
    pub tokeninfo_endpoint: String,

    /// Accepted `aud` values for ID tokens. Empty accepts any audience.
    pub client_ids: Vec<String>,

    /// Timeout for each call to Google.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Reject profiles whose email address Google has not verified.
    pub require_verified_email: bool,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            userinfo_endpoint: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
            tokeninfo_endpoint: "https://oauth2.googleapis.com/tokeninfo".to_string(),
            client_ids: Vec::new(),
            request_timeout: Duration::from_secs(10),
            require_verified_email: true,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The access token lifetime is zero
    /// - A Google endpoint is not an absolute URL
    /// - The Google request timeout is zero
    ///
    /// Returns `ConfigError::Missing` if the login channel is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oauth.access_token_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "oauth.access_token_lifetime must be > 0".to_string(),
            ));
        }

        for (name, endpoint) in [
            ("google.userinfo_endpoint", &self.google.userinfo_endpoint),
            ("google.tokeninfo_endpoint", &self.google.tokeninfo_endpoint),
        ] {
            url::Url::parse(endpoint).map_err(|e| {
                ConfigError::InvalidValue(format!("{name} is not a valid URL: {e}"))
            })?;
        }

        if self.google.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "google.request_timeout must be > 0".to_string(),
            ));
        }

        if self.login_channel.is_empty() {
            return Err(ConfigError::Missing("login_channel".to_string()));
        }

        Ok(())
    }
}
