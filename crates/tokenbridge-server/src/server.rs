use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tokenbridge_auth::{TokenState, token_handler};
use tower_http::trace::TraceLayer;

use crate::{bootstrap, config::AppConfig, handlers};

pub struct TokenBridgeServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(cfg: &AppConfig, token_state: TokenState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/oauth/token", post(token_handler).with_state(token_state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Connects storage and wires the grant engine.
    pub async fn build(self) -> anyhow::Result<TokenBridgeServer> {
        let storages = bootstrap::Storages::connect(&self.config).await?;
        let token_state = bootstrap::token_state(&self.config, storages)?;
        let app = build_app(&self.config, token_state);

        Ok(TokenBridgeServer {
            addr: self.addr,
            app,
        })
    }
}

impl TokenBridgeServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
