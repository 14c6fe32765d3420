//! Arc-owning storage adapter for use as `Arc<dyn RefreshTokenStorage>`.
//!
//! Wraps the lifetime-based [`TokenStorage`] and owns an `Arc<PgPool>`.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use authgate_auth::AuthResult;
use authgate_auth::storage::RefreshTokenStorage as RefreshTokenStorageTrait;
use authgate_auth::types::RefreshTokenRecord;

use crate::PgPool;
use crate::token::TokenStorage;

/// Arc-owning PostgreSQL refresh token storage adapter.
#[derive(Debug, Clone)]
pub struct PostgresRefreshTokenStorage {
    pool: Arc<PgPool>,
}

impl PostgresRefreshTokenStorage {
    /// Create a new Arc-owning refresh token storage.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStorageTrait for PostgresRefreshTokenStorage {
    async fn create(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
        TokenStorage::new(&self.pool).create(record).await?;
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        let row = TokenStorage::new(&self.pool).find_by_hash(token_hash).await?;
        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn revoke(&self, id: Uuid) -> AuthResult<bool> {
        let revoked = TokenStorage::new(&self.pool).revoke(id).await?;
        if !revoked {
            tracing::debug!(token_id = %id, "Refresh token already revoked");
        }
        Ok(revoked)
    }

    async fn rotate(&self, parent_id: Uuid, child: &RefreshTokenRecord) -> AuthResult<bool> {
        let rotated = TokenStorage::new(&self.pool).rotate(parent_id, child).await?;
        if !rotated {
            tracing::debug!(token_id = %parent_id, "Refresh token already revoked, not rotated");
        }
        Ok(rotated)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> AuthResult<u64> {
        Ok(TokenStorage::new(&self.pool).revoke_by_user(user_id).await?)
    }

    async fn list_active_for_user(&self, user_id: Uuid) -> AuthResult<Vec<RefreshTokenRecord>> {
        let rows = TokenStorage::new(&self.pool)
            .list_active_by_user(user_id)
            .await?;
        Ok(rows.into_iter().map(RefreshTokenRecord::from).collect())
    }
}
