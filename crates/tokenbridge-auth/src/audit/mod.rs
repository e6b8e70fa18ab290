//! Security event signaling.
//!
//! Grants report authentication failures through an [`EventEmitter`] and
//! successful logins through a [`LoginNotifier`]. The default
//! [`TracingEventEmitter`] writes both to the `tokenbridge::audit` tracing
//! target.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::types::UserIdentity;

/// Kind of request event raised by a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestEventKind {
    /// The client could not be resolved.
    ClientAuthenticationFailed,
    /// The user credential was rejected or could not be checked.
    UserAuthenticationFailed,
}

impl RequestEventKind {
    /// Returns the event name used in audit records.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientAuthenticationFailed => "client.authentication_failed",
            Self::UserAuthenticationFailed => "user.authentication_failed",
        }
    }
}

impl std::fmt::Display for RequestEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A security-relevant event tied to one token request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEvent {
    /// What happened.
    pub kind: RequestEventKind,

    /// Grant handling the request.
    pub grant_type: String,

    /// Client identifier from the request, if any.
    pub client_id: Option<String>,

    /// When the event was raised.
    #[serde(with = "time::serde::rfc3339")]
    pub occurred_at: OffsetDateTime,
}

impl RequestEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(kind: RequestEventKind, grant_type: impl Into<String>) -> Self {
        Self {
            kind,
            grant_type: grant_type.into(),
            client_id: None,
            occurred_at: OffsetDateTime::now_utc(),
        }
    }

    /// Sets the client identifier.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }
}

/// Receives request events.
///
/// Emission is infallible from the grant's point of view.
#[async_trait]
pub trait EventEmitter: Send + Sync {
    /// Records an event.
    async fn emit(&self, event: RequestEvent);
}

/// Receives successful logins.
#[async_trait]
pub trait LoginNotifier: Send + Sync {
    /// Records that `user` logged in through `channel`.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be recorded. Callers treat
    /// this as best-effort.
    async fn fire_login_event(&self, channel: &str, user: &UserIdentity) -> AuthResult<()>;
}

/// Writes events to the `tokenbridge::audit` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventEmitter;

impl TracingEventEmitter {
    /// Creates a new emitter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventEmitter for TracingEventEmitter {
    async fn emit(&self, event: RequestEvent) {
        tracing::warn!(
            target: "tokenbridge::audit",
            event = %event.kind,
            grant_type = %event.grant_type,
            client_id = event.client_id.as_deref().unwrap_or("-"),
            "Token request rejected"
        );
    }
}

#[async_trait]
impl LoginNotifier for TracingEventEmitter {
    async fn fire_login_event(&self, channel: &str, user: &UserIdentity) -> AuthResult<()> {
        tracing::info!(
            target: "tokenbridge::audit",
            event = "user.login",
            channel = %channel,
            user_id = %user.id,
            "User logged in"
        );
        Ok(())
    }
}
