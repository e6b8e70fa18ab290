use std::collections::HashSet;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tokenbridge_auth::config::AuthConfig;
use tokenbridge_auth::types::{Client, UserIdentity};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Token lifetimes, Google bridge and login channel
    #[serde(default)]
    pub auth: AuthConfig,
    /// Registered OAuth clients
    #[serde(default)]
    pub clients: Vec<ClientEntry>,
    /// Registered scopes and the defaults granted when a request names none
    #[serde(default)]
    pub scopes: ScopeSettings,
    /// Users served by the in-memory directory when no database is configured
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        if let Some(pg) = &self.storage.postgres
            && pg.url.trim().is_empty()
        {
            return Err("storage.postgres.url must not be empty".into());
        }

        self.auth.validate().map_err(|e| format!("auth: {e}"))?;

        let mut seen = HashSet::new();
        for entry in &self.clients {
            entry
                .to_client()
                .validate()
                .map_err(|e| format!("clients[{}]: {e}", entry.client_id))?;
            if !seen.insert(entry.client_id.as_str()) {
                return Err(format!("clients: duplicate client_id '{}'", entry.client_id));
            }
        }

        let registered: HashSet<&str> = self
            .scopes
            .registered
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        if self.scopes.registered.iter().any(|s| s.name.trim().is_empty()) {
            return Err("scopes.registered: scope name must not be empty".into());
        }
        if let Some(unknown) = self
            .scopes
            .default
            .iter()
            .find(|s| !registered.contains(s.as_str()))
        {
            return Err(format!("scopes.default: '{unknown}' is not a registered scope"));
        }

        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        let ip: std::net::IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::from((ip, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted request body size
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Storage backend selection.
///
/// Without a `postgres` section, token records, refresh tokens and users are
/// kept in memory and lost on restart.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub postgres: Option<PostgresStorageConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresStorageConfig {
    pub url: String,
    /// Create missing tables on startup
    #[serde(default = "default_true")]
    pub ensure_schema: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Client registration as written in the config file.
///
/// Unknown keys are rejected, so a restriction this server does not enforce
/// cannot be configured by mistake.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientEntry {
    pub client_id: String,
    pub name: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl ClientEntry {
    pub fn to_client(&self) -> Client {
        let mut client =
            Client::new(&self.client_id, &self.name).with_scopes(self.scopes.iter().cloned());
        client.active = self.active;
        client
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScopeSettings {
    /// Scopes granted when a request names none
    #[serde(default)]
    pub default: Vec<String>,
    #[serde(default)]
    pub registered: Vec<ScopeEntry>,
}

/// A scope and the grants allowed to request it. An empty list allows every grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeEntry {
    pub name: String,
    #[serde(default)]
    pub grant_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserEntry {
    pub fn to_identity(&self) -> UserIdentity {
        let identity = UserIdentity::new(&self.id).with_email(&self.email);
        match &self.name {
            Some(name) => identity.with_name(name),
            None => identity,
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File, FileFormat};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "tokenbridge.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., TOKENBRIDGE__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("TOKENBRIDGE")
                .try_parsing(true)
                .separator("__"),
        );
        finish(builder)
    }

    /// Loads configuration from an in-memory TOML document, without env overrides.
    pub fn load_config_from_str(toml: &str) -> Result<AppConfig, String> {
        finish(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<AppConfig, String> {
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::loader::load_config_from_str;
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.addr().port(), 8080);
        assert!(cfg.storage.postgres.is_none());
        assert_eq!(cfg.auth.login_channel, "api");
    }

    #[test]
    fn test_load_full_document() {
        let cfg = load_config_from_str(
            r#"
            [server]
            port = 9000

            [auth]
            login_channel = "mobile"

            [auth.oauth]
            access_token_lifetime = "15m"

            [[clients]]
            client_id = "mobile"
            name = "Mobile App"
            scopes = ["profile"]

            [scopes]
            default = ["profile"]

            [[scopes.registered]]
            name = "profile"
            grant_types = ["google_access_token"]

            [[users]]
            id = "42"
            email = "jane@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.auth.login_channel, "mobile");
        assert_eq!(cfg.auth.oauth.access_token_lifetime.as_secs(), 900);

        let client = cfg.clients[0].to_client();
        assert_eq!(client.client_id, "mobile");
        assert!(client.active);
        assert!(!client.is_scope_allowed("admin"));

        assert_eq!(cfg.users[0].to_identity().email.as_deref(), Some("jane@example.com"));
    }

    #[test]
    fn test_rejects_duplicate_clients() {
        let err = load_config_from_str(
            r#"
            [[clients]]
            client_id = "mobile"
            name = "One"

            [[clients]]
            client_id = "mobile"
            name = "Two"
            "#,
        )
        .unwrap_err();
        assert!(err.contains("duplicate client_id"), "{err}");
    }

    #[test]
    fn test_rejects_unregistered_default_scope() {
        let err = load_config_from_str(
            r#"
            [scopes]
            default = ["profile"]
            "#,
        )
        .unwrap_err();
        assert!(err.contains("scopes.default"), "{err}");
    }

    #[test]
    fn test_rejects_client_with_empty_name() {
        let err = load_config_from_str(
            r#"
            [[clients]]
            client_id = "backend"
            name = ""
            "#,
        )
        .unwrap_err();
        assert!(err.contains("clients[backend]"), "{err}");
    }

    #[test]
    fn test_rejects_unenforced_client_keys() {
        for key in [
            r#"grant_types = ["client_credentials"]"#,
            r#"client_secret = "s3cret""#,
            "confidential = true",
        ] {
            let doc = format!(
                "[[clients]]\nclient_id = \"mobile\"\nname = \"Mobile\"\n{key}\n"
            );
            let err = load_config_from_str(&doc).unwrap_err();
            assert!(err.contains("deserialize"), "{key}: {err}");
        }
    }

    #[test]
    fn test_rejects_empty_postgres_url() {
        let mut cfg = AppConfig::default();
        cfg.storage.postgres = Some(PostgresStorageConfig {
            url: " ".into(),
            ensure_schema: true,
        });
        assert!(cfg.validate().is_err());
    }
}
