//! Google access token grant.
//!
//! Exchanges a Google access token for this server's own access and refresh
//! tokens. The user never presents a password: Google vouches for the token
//! and the [`IdentityBridge`] maps it to a local user.
//!
//! # Request
//!
//! ```text
//! POST /oauth/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! grant_type=google_access_token&client_id=mobile&scope=profile&token=ya29.a0Af...
//! ```
//!
//! # Client resolution
//!
//! The client is looked up by identifier only; `client_secret` is neither
//! required nor checked. Clients using this grant are public clients (mobile
//! and browser apps that cannot keep a secret), and the Google token is the
//! credential that authenticates the exchange.

use std::sync::Arc;

use async_trait::async_trait;
use time::Duration;
use tracing::{debug, warn};

use crate::AuthResult;
use crate::audit::{EventEmitter, LoginNotifier, RequestEvent, RequestEventKind};
use crate::error::AuthError;
use crate::federation::IdentityBridge;
use crate::oauth::grant::Grant;
use crate::oauth::request::TokenRequest;
use crate::oauth::token::BearerTokenResponse;
use crate::storage::{ClientStorage, ScopeStorage};
use crate::token::{CalendarMonths, TokenIssuer};
use crate::types::{Client, Scope, UserIdentity, parse_scope_list};

/// `grant_type` value this grant is registered under.
///
/// Persisted tokens and scope policies reference it; it must not change.
pub const GRANT_IDENTIFIER: &str = "google_access_token";

/// Lifetime of refresh tokens issued by this grant: one calendar month.
pub const REFRESH_TOKEN_TTL: CalendarMonths = CalendarMonths(1);

/// Default channel the login event is tagged with.
pub const DEFAULT_LOGIN_CHANNEL: &str = "api";

/// The `google_access_token` grant.
pub struct GoogleAccessTokenGrant {
    clients: Arc<dyn ClientStorage>,
    scopes: Arc<dyn ScopeStorage>,
    issuer: Arc<dyn TokenIssuer>,
    bridge: Arc<dyn IdentityBridge>,
    emitter: Arc<dyn EventEmitter>,
    login_notifier: Arc<dyn LoginNotifier>,
    login_channel: String,
    refresh_token_ttl: CalendarMonths,
}

impl GoogleAccessTokenGrant {
    /// Creates the grant over its collaborators.
    #[must_use]
    pub fn new(
        clients: Arc<dyn ClientStorage>,
        scopes: Arc<dyn ScopeStorage>,
        issuer: Arc<dyn TokenIssuer>,
        bridge: Arc<dyn IdentityBridge>,
        emitter: Arc<dyn EventEmitter>,
        login_notifier: Arc<dyn LoginNotifier>,
    ) -> Self {
        Self {
            clients,
            scopes,
            issuer,
            bridge,
            emitter,
            login_notifier,
            login_channel: DEFAULT_LOGIN_CHANNEL.to_string(),
            refresh_token_ttl: REFRESH_TOKEN_TTL,
        }
    }

    /// Sets the channel the login event is tagged with.
    #[must_use]
    pub fn with_login_channel(mut self, channel: impl Into<String>) -> Self {
        self.login_channel = channel.into();
        self
    }

    /// Lifetime of the refresh tokens this grant issues.
    #[must_use]
    pub fn refresh_token_ttl(&self) -> CalendarMonths {
        self.refresh_token_ttl
    }

    fn event(&self, kind: RequestEventKind, client_id: Option<&str>) -> RequestEvent {
        let event = RequestEvent::new(kind, GRANT_IDENTIFIER);
        match client_id {
            Some(id) => event.with_client_id(id),
            None => event,
        }
    }

    /// Resolves the client named by the request, without checking a secret.
    async fn validate_client(&self, request: &TokenRequest) -> AuthResult<Client> {
        let client_id = request
            .parameter_or("client_id", request.basic_auth_username())
            .ok_or_else(|| AuthError::invalid_request("client_id"))?;

        match self.clients.find_by_client_id(client_id).await? {
            Some(client) => Ok(client),
            None => {
                self.emitter
                    .emit(self.event(RequestEventKind::ClientAuthenticationFailed, Some(client_id)))
                    .await;
                Err(AuthError::invalid_client(format!(
                    "Client '{client_id}' is not registered"
                )))
            }
        }
    }

    /// Resolves each requested scope name for this grant.
    async fn validate_scopes(&self, scope_param: Option<&str>) -> AuthResult<Vec<Scope>> {
        let mut scopes = Vec::new();
        for name in parse_scope_list(scope_param.unwrap_or_default()) {
            let scope = self
                .scopes
                .find_scope(name, GRANT_IDENTIFIER)
                .await?
                .ok_or_else(|| AuthError::invalid_scope(name))?;
            scopes.push(scope);
        }
        Ok(scopes)
    }

    /// Resolves the user owning the Google token.
    async fn validate_user(&self, request: &TokenRequest, client: &Client) -> AuthResult<UserIdentity> {
        let token = request
            .parameter("token")
            .ok_or_else(|| AuthError::invalid_request("token"))?;

        let user = match self.bridge.lookup_by_access_token(token).await {
            Ok(user) => user,
            Err(e) => {
                warn!(
                    client_id = %client.client_id,
                    error = %e,
                    rejected = e.is_validation_error(),
                    upstream = e.is_external_error(),
                    "Google token lookup failed"
                );
                self.emitter
                    .emit(self.event(
                        RequestEventKind::UserAuthenticationFailed,
                        Some(&client.client_id),
                    ))
                    .await;
                return Err(AuthError::invalid_request("token"));
            }
        };

        match user {
            Some(user) => Ok(user),
            None => {
                self.emitter
                    .emit(self.event(
                        RequestEventKind::UserAuthenticationFailed,
                        Some(&client.client_id),
                    ))
                    .await;
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

#[async_trait]
impl Grant for GoogleAccessTokenGrant {
    fn identifier(&self) -> &'static str {
        GRANT_IDENTIFIER
    }

    async fn respond_to_access_token_request(
        &self,
        request: &TokenRequest,
        mut response: BearerTokenResponse,
        access_token_ttl: Duration,
    ) -> AuthResult<BearerTokenResponse> {
        let client = self.validate_client(request).await?;
        let scopes = self.validate_scopes(request.parameter("scope")).await?;
        let user = self.validate_user(request, &client).await?;

        let scopes = self
            .scopes
            .finalize_scopes(scopes, GRANT_IDENTIFIER, &client, &user.id)
            .await?;

        let access_token = self
            .issuer
            .issue_access_token(access_token_ttl, &client, &user.id, &scopes)
            .await?;
        let refresh_token = match self
            .issuer
            .issue_refresh_token(&access_token, self.refresh_token_ttl)
            .await
        {
            Ok(token) => token,
            Err(e) => {
                // The access token never reaches the client; keep its record unusable.
                if let Err(revoke_err) = self.issuer.revoke_access_token(&access_token).await {
                    warn!(
                        token_id = %access_token.identifier,
                        error = %revoke_err,
                        "Failed to revoke access token after refresh token failure"
                    );
                }
                return Err(e);
            }
        };

        debug!(
            client_id = %client.client_id,
            user_id = %user.id,
            token_id = %access_token.identifier,
            "Google access token exchanged"
        );

        response.set_access_token(access_token);
        response.set_refresh_token(refresh_token);

        if let Err(e) = self
            .login_notifier
            .fire_login_event(&self.login_channel, &user)
            .await
        {
            warn!(
                user_id = %user.id,
                channel = %self.login_channel,
                error = %e,
                "Failed to fire login event"
            );
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::IdpError;
    use crate::storage::{
        InMemoryClientStorage, InMemoryRefreshTokenStorage, InMemoryScopeStorage,
        InMemoryTokenRecordStorage, RefreshTokenStorage, TokenRecordStorage,
    };
    use crate::token::OpaqueTokenIssuer;
    use crate::types::{AccessToken, IssuedRefreshToken, RefreshToken};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use time::OffsetDateTime;

    type Journal = Arc<Mutex<Vec<&'static str>>>;

    enum BridgeOutcome {
        Resolve,
        NoUser,
        Fail,
    }

    struct CountingBridge {
        outcome: BridgeOutcome,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentityBridge for CountingBridge {
        async fn lookup_by_access_token(
            &self,
            token: &str,
        ) -> Result<Option<UserIdentity>, IdpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                BridgeOutcome::Resolve => Ok(Some(
                    UserIdentity::new("user-42").with_email(format!("{token}@example.com")),
                )),
                BridgeOutcome::NoUser => Ok(None),
                BridgeOutcome::Fail => Err(IdpError::HttpStatus(401)),
            }
        }

        async fn lookup_by_id_token(&self, _token: &str) -> Result<Option<UserIdentity>, IdpError> {
            unreachable!("the access token grant never uses ID tokens")
        }
    }

    #[derive(Default)]
    struct RecordingEmitter {
        events: Mutex<Vec<RequestEvent>>,
    }

    impl RecordingEmitter {
        fn kinds(&self) -> Vec<RequestEventKind> {
            self.events.lock().unwrap().iter().map(|e| e.kind).collect()
        }
    }

    #[async_trait]
    impl EventEmitter for RecordingEmitter {
        async fn emit(&self, event: RequestEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct RecordingNotifier {
        logins: Mutex<Vec<(String, String)>>,
        journal: Journal,
        fail: bool,
    }

    #[async_trait]
    impl LoginNotifier for RecordingNotifier {
        async fn fire_login_event(&self, channel: &str, user: &UserIdentity) -> AuthResult<()> {
            self.journal.lock().unwrap().push("login");
            self.logins
                .lock()
                .unwrap()
                .push((channel.to_string(), user.id.clone()));
            if self.fail {
                return Err(AuthError::internal("event bus unavailable"));
            }
            Ok(())
        }
    }

    /// Issuer that records the order of issuance calls.
    struct JournalingIssuer {
        inner: OpaqueTokenIssuer,
        journal: Journal,
    }

    #[async_trait]
    impl TokenIssuer for JournalingIssuer {
        async fn issue_access_token(
            &self,
            ttl: Duration,
            client: &Client,
            user_id: &str,
            scopes: &[Scope],
        ) -> AuthResult<AccessToken> {
            let token = self
                .inner
                .issue_access_token(ttl, client, user_id, scopes)
                .await?;
            self.journal.lock().unwrap().push("access");
            Ok(token)
        }

        async fn issue_refresh_token(
            &self,
            access_token: &AccessToken,
            lifetime: CalendarMonths,
        ) -> AuthResult<IssuedRefreshToken> {
            let token = self.inner.issue_refresh_token(access_token, lifetime).await?;
            self.journal.lock().unwrap().push("refresh");
            Ok(token)
        }

        async fn revoke_access_token(&self, access_token: &AccessToken) -> AuthResult<()> {
            self.inner.revoke_access_token(access_token).await?;
            self.journal.lock().unwrap().push("revoke");
            Ok(())
        }
    }

    /// Refresh token store whose writes always fail.
    #[derive(Default)]
    struct UnavailableRefreshTokens {
        attempted_for: Mutex<Option<String>>,
    }

    #[async_trait]
    impl RefreshTokenStorage for UnavailableRefreshTokens {
        async fn create(&self, token: &RefreshToken) -> AuthResult<()> {
            *self.attempted_for.lock().unwrap() = Some(token.access_token_id.clone());
            Err(AuthError::storage("refresh token table unavailable"))
        }

        async fn find_by_hash(&self, _token_hash: &str) -> AuthResult<Option<RefreshToken>> {
            Ok(None)
        }
    }

    struct Harness {
        grant: GoogleAccessTokenGrant,
        bridge: Arc<CountingBridge>,
        emitter: Arc<RecordingEmitter>,
        notifier: Arc<RecordingNotifier>,
        records: Arc<InMemoryTokenRecordStorage>,
        refresh_tokens: Arc<InMemoryRefreshTokenStorage>,
        journal: Journal,
    }

    fn harness_with(outcome: BridgeOutcome, notifier_fails: bool) -> Harness {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let records = Arc::new(InMemoryTokenRecordStorage::new());
        let refresh_tokens = Arc::new(InMemoryRefreshTokenStorage::new());
        let bridge = Arc::new(CountingBridge {
            outcome,
            calls: AtomicUsize::new(0),
        });
        let emitter = Arc::new(RecordingEmitter::default());
        let notifier = Arc::new(RecordingNotifier {
            logins: Mutex::new(Vec::new()),
            journal: journal.clone(),
            fail: notifier_fails,
        });

        let clients = InMemoryClientStorage::with_clients([
            Client::new("mobile", "Mobile App"),
            Client::new("kiosk", "Kiosk").with_scopes(vec!["profile".to_string()]),
        ]);
        let scopes = InMemoryScopeStorage::new()
            .with_scope("profile")
            .with_scope("email")
            .with_grant_scope("admin", ["client_credentials"])
            .with_default_scopes(["profile"]);
        let issuer = JournalingIssuer {
            inner: OpaqueTokenIssuer::new(records.clone(), refresh_tokens.clone()),
            journal: journal.clone(),
        };

        let grant = GoogleAccessTokenGrant::new(
            Arc::new(clients),
            Arc::new(scopes),
            Arc::new(issuer),
            bridge.clone(),
            emitter.clone(),
            notifier.clone(),
        );

        Harness {
            grant,
            bridge,
            emitter,
            notifier,
            records,
            refresh_tokens,
            journal,
        }
    }

    fn harness(outcome: BridgeOutcome) -> Harness {
        harness_with(outcome, false)
    }

    fn request(pairs: &[(&str, &str)]) -> TokenRequest {
        TokenRequest::from_pairs(pairs.iter().copied())
    }

    async fn exchange(h: &Harness, request: &TokenRequest) -> AuthResult<BearerTokenResponse> {
        h.grant
            .respond_to_access_token_request(request, BearerTokenResponse::new(), Duration::hours(1))
            .await
    }

    #[test]
    fn test_identifier_is_stable() {
        let h = harness(BridgeOutcome::Resolve);
        assert_eq!(h.grant.identifier(), "google_access_token");
        assert_eq!(h.grant.refresh_token_ttl(), CalendarMonths(1));
    }

    #[tokio::test]
    async fn test_missing_client_id_fails_before_bridge() {
        let h = harness(BridgeOutcome::Resolve);
        let err = exchange(&h, &request(&[("token", "tok")])).await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidRequest { ref parameter } if parameter == "client_id"));
        assert_eq!(h.bridge.calls.load(Ordering::SeqCst), 0);
        assert!(h.emitter.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_client_emits_client_auth_failed_once() {
        let h = harness(BridgeOutcome::Resolve);
        let err = exchange(&h, &request(&[("client_id", "ghost"), ("token", "tok")]))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidClient { .. }));
        assert_eq!(
            h.emitter.kinds(),
            vec![RequestEventKind::ClientAuthenticationFailed]
        );
        assert_eq!(h.bridge.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_client_secret_is_not_checked() {
        let h = harness(BridgeOutcome::Resolve);
        let req = request(&[
            ("client_id", "mobile"),
            ("client_secret", "definitely-wrong"),
            ("token", "tok"),
        ]);
        assert!(exchange(&h, &req).await.is_ok());
    }

    #[tokio::test]
    async fn test_client_id_from_basic_auth() {
        let h = harness(BridgeOutcome::Resolve);
        let req = TokenRequest::from_pairs([("token", "tok")]).with_basic_auth("mobile", "");
        let response = exchange(&h, &req).await.unwrap();
        assert_eq!(response.access_token().unwrap().client_id, "mobile");
    }

    #[tokio::test]
    async fn test_body_client_id_wins_over_basic_auth() {
        let h = harness(BridgeOutcome::Resolve);
        let req = TokenRequest::from_pairs([("client_id", "kiosk"), ("token", "tok")])
            .with_basic_auth("mobile", "");
        let response = exchange(&h, &req).await.unwrap();
        assert_eq!(response.access_token().unwrap().client_id, "kiosk");
    }

    #[tokio::test]
    async fn test_unknown_scope_is_rejected() {
        let h = harness(BridgeOutcome::Resolve);
        let err = exchange(
            &h,
            &request(&[("client_id", "mobile"), ("scope", "profile nope"), ("token", "tok")]),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AuthError::InvalidScope { ref scope } if scope == "nope"));
        assert_eq!(h.bridge.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scope_not_permitted_for_grant_is_rejected() {
        let h = harness(BridgeOutcome::Resolve);
        let err = exchange(
            &h,
            &request(&[("client_id", "mobile"), ("scope", "admin"), ("token", "tok")]),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AuthError::InvalidScope { ref scope } if scope == "admin"));
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_bridge() {
        let h = harness(BridgeOutcome::Resolve);
        let err = exchange(&h, &request(&[("client_id", "mobile")])).await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidRequest { ref parameter } if parameter == "token"));
        assert_eq!(h.bridge.calls.load(Ordering::SeqCst), 0);
        assert!(h.emitter.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_bridge_error_is_invalid_request_token() {
        let h = harness(BridgeOutcome::Fail);
        let err = exchange(&h, &request(&[("client_id", "mobile"), ("token", "expired")]))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidRequest { ref parameter } if parameter == "token"));
        assert!(!err.to_string().contains("401"));
        assert_eq!(
            h.emitter.kinds(),
            vec![RequestEventKind::UserAuthenticationFailed]
        );
        assert_eq!(h.bridge.calls.load(Ordering::SeqCst), 1);
        assert!(h.records.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_user_is_invalid_credentials() {
        let h = harness(BridgeOutcome::NoUser);
        let err = exchange(&h, &request(&[("client_id", "mobile"), ("token", "stranger")]))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(
            h.emitter.kinds(),
            vec![RequestEventKind::UserAuthenticationFailed]
        );
        assert!(h.notifier.logins.lock().unwrap().is_empty());
        assert!(h.records.is_empty().await);
    }

    #[tokio::test]
    async fn test_successful_exchange_issues_both_tokens() {
        let h = harness(BridgeOutcome::Resolve);
        let response = exchange(
            &h,
            &request(&[("client_id", "mobile"), ("scope", "profile email"), ("token", "jane")]),
        )
        .await
        .unwrap();

        let access = response.access_token().unwrap();
        let refresh = response.refresh_token().unwrap();
        assert!(!access.value.is_empty());
        assert!(!refresh.value.is_empty());
        assert_eq!(access.user_id, "user-42");
        assert_eq!(refresh.access_token_id, access.identifier);
        assert_eq!(
            access.scopes,
            vec![Scope::new("profile"), Scope::new("email")]
        );

        let record = h.records.find_by_token_id(&access.identifier).await.unwrap();
        assert!(record.is_some());
        let stored = h
            .refresh_tokens
            .find_by_hash(&RefreshToken::hash_token(&refresh.value))
            .await
            .unwrap();
        assert!(stored.is_some());

        assert!(h.emitter.kinds().is_empty());
        assert_eq!(
            *h.notifier.logins.lock().unwrap(),
            vec![("api".to_string(), "user-42".to_string())]
        );
        assert_eq!(*h.journal.lock().unwrap(), vec!["access", "refresh", "login"]);
    }

    #[tokio::test]
    async fn test_scopes_are_finalized() {
        let h = harness(BridgeOutcome::Resolve);

        // No scope requested: the store's defaults apply.
        let response = exchange(&h, &request(&[("client_id", "mobile"), ("token", "jane")]))
            .await
            .unwrap();
        assert_eq!(response.access_token().unwrap().scopes, vec![Scope::new("profile")]);

        // The kiosk client may only hold "profile".
        let response = exchange(
            &h,
            &request(&[("client_id", "kiosk"), ("scope", "profile email"), ("token", "jane")]),
        )
        .await
        .unwrap();
        assert_eq!(response.access_token().unwrap().scopes, vec![Scope::new("profile")]);
    }

    #[tokio::test]
    async fn test_refresh_token_lifetime_ignores_access_ttl() {
        let h = harness(BridgeOutcome::Resolve);
        let req = request(&[("client_id", "mobile"), ("token", "jane")]);

        for ttl in [Duration::minutes(5), Duration::days(2)] {
            let before = OffsetDateTime::now_utc();
            let response = h
                .grant
                .respond_to_access_token_request(&req, BearerTokenResponse::new(), ttl)
                .await
                .unwrap();
            let after = OffsetDateTime::now_utc();

            let expires_at = response.refresh_token().unwrap().expires_at;
            assert!(expires_at >= REFRESH_TOKEN_TTL.after(before).unwrap());
            assert!(expires_at <= REFRESH_TOKEN_TTL.after(after).unwrap());
        }
    }

    #[tokio::test]
    async fn test_refresh_failure_revokes_access_token() {
        let h = harness(BridgeOutcome::Resolve);
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let refresh_tokens = Arc::new(UnavailableRefreshTokens::default());
        let issuer = JournalingIssuer {
            inner: OpaqueTokenIssuer::new(h.records.clone(), refresh_tokens.clone()),
            journal: journal.clone(),
        };
        let grant = GoogleAccessTokenGrant::new(
            Arc::new(InMemoryClientStorage::with_clients([Client::new("mobile", "Mobile App")])),
            Arc::new(InMemoryScopeStorage::new().with_scope("profile")),
            Arc::new(issuer),
            h.bridge.clone(),
            h.emitter.clone(),
            h.notifier.clone(),
        );

        let err = grant
            .respond_to_access_token_request(
                &request(&[("client_id", "mobile"), ("token", "jane")]),
                BearerTokenResponse::new(),
                Duration::hours(1),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Storage { .. }));
        assert_eq!(*journal.lock().unwrap(), vec!["access", "revoke"]);
        assert!(h.notifier.logins.lock().unwrap().is_empty());

        let token_id = refresh_tokens.attempted_for.lock().unwrap().clone().unwrap();
        let record = h.records.find_by_token_id(&token_id).await.unwrap().unwrap();
        assert!(record.revoked);
        assert_eq!(h.records.len().await, 1);
    }

    #[tokio::test]
    async fn test_login_event_failure_does_not_fail_exchange() {
        let h = harness_with(BridgeOutcome::Resolve, true);
        let response = exchange(&h, &request(&[("client_id", "mobile"), ("token", "jane")]))
            .await
            .unwrap();

        assert!(response.access_token().is_some());
        assert!(response.refresh_token().is_some());
        assert_eq!(h.notifier.logins.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_custom_login_channel() {
        let h = harness(BridgeOutcome::Resolve);
        let Harness {
            grant, notifier, ..
        } = h;
        let grant = grant.with_login_channel("mobile-app");

        grant
            .respond_to_access_token_request(
                &request(&[("client_id", "mobile"), ("token", "jane")]),
                BearerTokenResponse::new(),
                Duration::hours(1),
            )
            .await
            .unwrap();

        assert_eq!(notifier.logins.lock().unwrap()[0].0, "mobile-app");
    }
}
