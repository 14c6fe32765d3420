//! PostgreSQL storage backend for authgate.
//!
//! Stores refresh token records in a single `refresh_tokens` table with plain
//! columns. Revocation is a conditional `UPDATE` so that concurrent refreshes
//! of the same token are serialized by the row lock on that one record.
//!
//! # Example
//!
//! ```ignore
//! use authgate_auth_postgres::{PostgresAuthStorage, PoolSettings};
//!
//! let storage = PostgresAuthStorage::connect("postgres://localhost/authgate", PoolSettings::default()).await?;
//! storage.ensure_schema().await?;
//!
//! let refresh_tokens = storage.refresh_token_storage();
//! ```

pub mod schema;
pub mod storage_adapters;
pub mod token;

use std::sync::Arc;
use std::time::Duration;

use authgate_auth::AuthError;
use sqlx_core::pool::Pool;
use sqlx_postgres::Postgres;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use storage_adapters::PostgresRefreshTokenStorage;
pub use token::{TokenRow, TokenStorage};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Resource already exists (conflict).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StorageError {
    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create an `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Returns `true` if this is a client error (4xx equivalent).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::InvalidInput(_))
    }

    /// Returns `true` if this is a server error (5xx equivalent).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Database(_) => AuthError::storage_unavailable(err.to_string()),
            StorageError::Conflict(_) | StorageError::InvalidInput(_) => {
                AuthError::internal(err.to_string())
            }
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// PostgreSQL Auth Storage
// =============================================================================

/// Connection pool settings.
#[derive(Debug, Clone, Copy)]
pub struct PoolSettings {
    /// Maximum number of pooled connections.
    pub max_connections: u32,
    /// How long to wait for a connection before failing.
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// PostgreSQL storage backend for session credentials.
#[derive(Debug, Clone)]
pub struct PostgresAuthStorage {
    pool: Arc<PgPool>,
}

impl PostgresAuthStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str, settings: PoolSettings) -> StorageResult<Self> {
        use sqlx_core::pool::PoolOptions;

        let pool = PoolOptions::<Postgres>::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(database_url)
            .await?;

        tracing::info!(
            max_connections = settings.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(Self::new(Arc::new(pool)))
    }

    /// Creates the refresh token table and its indexes if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a DDL statement fails.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        schema::ensure_schema(&self.pool).await
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get token storage operations.
    #[must_use]
    pub fn tokens(&self) -> TokenStorage<'_> {
        TokenStorage::new(&self.pool)
    }

    /// Arc-owning refresh token storage for use as `Arc<dyn RefreshTokenStorage>`.
    #[must_use]
    pub fn refresh_token_storage(&self) -> PostgresRefreshTokenStorage {
        PostgresRefreshTokenStorage::new(Arc::clone(&self.pool))
    }
}

// =============================================================================
// Tests
// =============================================================================
