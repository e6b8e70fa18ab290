//! OAuth 2.0 token endpoint handler.
//!
//! # Example
//!
//! ```text
//! POST /oauth/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=google_access_token
//! &client_id=mobile
//! &scope=profile
//! &token=ya29.a0Af...
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use time::Duration;
use tracing::{debug, error, info, warn};

use crate::AuthResult;
use crate::config::OAuthConfig;
use crate::error::AuthError;
use crate::oauth::{GrantRegistry, TokenError, TokenRequest, TokenResponse};

/// State required for the token endpoint.
#[derive(Clone)]
pub struct TokenState {
    /// Registered grants.
    registry: Arc<GrantRegistry>,
    /// Access token lifetime handed to grants.
    access_token_ttl: Duration,
}

impl TokenState {
    /// Creates a new token state.
    #[must_use]
    pub fn new(registry: GrantRegistry, access_token_ttl: Duration) -> Self {
        Self {
            registry: Arc::new(registry),
            access_token_ttl,
        }
    }

    /// Creates a token state using the configured access token lifetime.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the lifetime does not fit a
    /// [`time::Duration`].
    pub fn from_config(registry: GrantRegistry, config: &OAuthConfig) -> AuthResult<Self> {
        let ttl = Duration::try_from(config.access_token_lifetime).map_err(|e| {
            AuthError::configuration(format!("oauth.access_token_lifetime is out of range: {e}"))
        })?;
        Ok(Self::new(registry, ttl))
    }

    /// Access token lifetime handed to grants.
    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }
}

/// OAuth 2.0 token endpoint handler.
///
/// Handles POST requests with an `application/x-www-form-urlencoded` body and
/// dispatches them on `grant_type`. Basic credentials in the `Authorization`
/// header are made available to the grant.
pub async fn token_handler(
    State(state): State<TokenState>,
    headers: HeaderMap,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let request = TokenRequest::new(params).with_authorization_header(authorization);
    let grant_type = request.grant_type().unwrap_or("-").to_string();

    debug!(grant_type = %grant_type, "Processing token request");

    match state
        .registry
        .respond_to_access_token_request(&request, state.access_token_ttl)
        .await
        .and_then(|response| response.into_response_body())
    {
        Ok(body) => {
            info!(grant_type = %grant_type, "Token issued successfully");
            token_success_response(body)
        }
        Err(e) => {
            if e.is_server_error() {
                error!(grant_type = %grant_type, error = %e, "Token request failed");
            } else {
                warn!(grant_type = %grant_type, error = %e, "Token request rejected");
            }
            token_error_response(&e)
        }
    }
}

/// Build a success response for token endpoint.
fn token_success_response(response: TokenResponse) -> Response {
    (
        StatusCode::OK,
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(response),
    )
        .into_response()
}

/// Build an error response for token endpoint.
fn token_error_response(error: &AuthError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response = (
        status,
        [
            (header::CACHE_CONTROL, "no-store"),
            (header::PRAGMA, "no-cache"),
        ],
        Json(TokenError::from(error)),
    )
        .into_response();

    if status == StatusCode::UNAUTHORIZED {
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Basic realm=\"tokenbridge\""),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_request_response() {
        let response = token_error_response(&AuthError::invalid_request("token"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

        let json = body_json(response).await;
        assert_eq!(json["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_invalid_client_response_challenges() {
        let response = token_error_response(&AuthError::invalid_client("unknown"));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_some());

        let json = body_json(response).await;
        assert_eq!(json["error"], "invalid_client");
    }

    #[tokio::test]
    async fn test_invalid_credentials_response() {
        let response = token_error_response(&AuthError::InvalidCredentials);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"], "invalid_grant");
    }

    #[tokio::test]
    async fn test_storage_error_response() {
        let response = token_error_response(&AuthError::storage("pool timed out"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "server_error");
    }

    #[test]
    fn test_state_from_config() {
        let state = TokenState::from_config(GrantRegistry::new(), &OAuthConfig::default()).unwrap();
        assert_eq!(state.access_token_ttl(), Duration::hours(1));
    }
}
