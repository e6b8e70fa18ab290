pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;

pub use config::{AppConfig, PostgresStorageConfig, ServerConfig};
pub use observability::init_tracing;
pub use server::{ServerBuilder, TokenBridgeServer, build_app};
