//! Token endpoint request.
//!
//! Grants see the request as a flat parameter map plus the optional HTTP
//! Basic credentials from the `Authorization` header.

use std::collections::HashMap;

/// Credentials decoded from an `Authorization: Basic ...` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Username part, the client identifier for OAuth clients.
    pub username: String,

    /// Password part, the client secret for OAuth clients.
    pub password: String,
}

/// An inbound token request.
#[derive(Debug, Clone, Default)]
pub struct TokenRequest {
    params: HashMap<String, String>,
    basic_auth: Option<BasicCredentials>,
}

impl TokenRequest {
    /// Creates a request from form parameters.
    #[must_use]
    pub fn new(params: HashMap<String, String>) -> Self {
        Self {
            params,
            basic_auth: None,
        }
    }

    /// Creates a request from `(name, value)` pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Attaches Basic credentials parsed from an `Authorization` header value.
    ///
    /// A missing or malformed header leaves the request without credentials.
    #[must_use]
    pub fn with_authorization_header(mut self, header: Option<&str>) -> Self {
        self.basic_auth = header.and_then(parse_basic_auth);
        self
    }

    /// Attaches Basic credentials.
    #[must_use]
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth = Some(BasicCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Returns a request parameter. Empty values count as absent.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Returns a request parameter, or `default` when it is absent.
    #[must_use]
    pub fn parameter_or<'a>(&'a self, name: &str, default: Option<&'a str>) -> Option<&'a str> {
        self.parameter(name).or(default)
    }

    /// The `grant_type` parameter.
    #[must_use]
    pub fn grant_type(&self) -> Option<&str> {
        self.parameter("grant_type")
    }

    /// Basic credentials, if the request carried any.
    #[must_use]
    pub fn basic_auth(&self) -> Option<&BasicCredentials> {
        self.basic_auth.as_ref()
    }

    /// Basic username, if the request carried Basic credentials.
    #[must_use]
    pub fn basic_auth_username(&self) -> Option<&str> {
        self.basic_auth
            .as_ref()
            .map(|c| c.username.as_str())
            .filter(|u| !u.is_empty())
    }
}

/// Parses an HTTP Basic `Authorization` header value.
///
/// Returns `None` unless the value is `Basic <base64(user:password)>`.
/// The password may itself contain colons.
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<BasicCredentials> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header_value.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (username, password) = credentials.split_once(':')?;

    Some(BasicCredentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn test_parse_basic_auth_valid() {
        let header = format!("Basic {}", STANDARD.encode(b"mobile:s3cr:et"));
        let credentials = parse_basic_auth(&header).unwrap();
        assert_eq!(credentials.username, "mobile");
        assert_eq!(credentials.password, "s3cr:et");
    }

    #[test]
    fn test_parse_basic_auth_rejects_other_schemes() {
        assert!(parse_basic_auth("Bearer token").is_none());
        assert!(parse_basic_auth("Basic !!!invalid!!!").is_none());

        let header = format!("Basic {}", STANDARD.encode(b"no-colon-here"));
        assert!(parse_basic_auth(&header).is_none());
    }

    #[test]
    fn test_empty_parameter_is_absent() {
        let request = TokenRequest::from_pairs([("scope", ""), ("token", "abc")]);
        assert_eq!(request.parameter("scope"), None);
        assert_eq!(request.parameter("token"), Some("abc"));
        assert_eq!(request.parameter("missing"), None);
    }

    #[test]
    fn test_parameter_or_prefers_body() {
        let request = TokenRequest::from_pairs([("client_id", "body-client")])
            .with_basic_auth("header-client", "");
        assert_eq!(
            request.parameter_or("client_id", request.basic_auth_username()),
            Some("body-client")
        );

        let request = TokenRequest::default().with_basic_auth("header-client", "");
        assert_eq!(
            request.parameter_or("client_id", request.basic_auth_username()),
            Some("header-client")
        );
    }

    #[test]
    fn test_authorization_header_is_parsed() {
        let header = format!("Basic {}", STANDARD.encode(b"mobile:"));
        let request = TokenRequest::default().with_authorization_header(Some(&header));
        assert_eq!(request.basic_auth_username(), Some("mobile"));

        let request = TokenRequest::default().with_authorization_header(Some("Bearer x"));
        assert!(request.basic_auth().is_none());
    }
}
