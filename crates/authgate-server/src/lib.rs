pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod observability;
pub mod server;

pub use config::{
    AlertingConfig, AppConfig, LoggingConfig, PostgresStorageConfig, ServerConfig, StorageBackend,
    StorageConfig,
};
pub use error::{ApiError, status_for};
pub use observability::{apply_logging_level, init_tracing};
pub use server::{AppState, AuthgateServer, ServerBuilder, build_app};
