//! Refresh token storage.
//!
//! Raw SQL over the `refresh_tokens` table. Only digests of refresh secrets
//! are stored.

use authgate_auth::types::RefreshTokenRecord;
use sqlx_core::executor::Executor;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::{PgConnection, Postgres};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{PgPool, StorageError, StorageResult};

// =============================================================================
// Types
// =============================================================================

type TokenTuple = (
    Uuid,
    Uuid,
    String,
    String,
    String,
    OffsetDateTime,
    OffsetDateTime,
    Option<Uuid>,
    bool,
    Option<OffsetDateTime>,
);

const COLUMNS: &str = "id, user_id, token_hash, user_agent, ip, issued_at, expires_at, parent_id, revoked, revoked_at";

/// Refresh token row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub user_agent: String,
    pub ip: String,
    pub issued_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub parent_id: Option<Uuid>,
    pub revoked: bool,
    pub revoked_at: Option<OffsetDateTime>,
}

impl TokenRow {
    /// Create from database tuple.
    fn from_tuple(row: TokenTuple) -> Self {
        Self {
            id: row.0,
            user_id: row.1,
            token_hash: row.2,
            user_agent: row.3,
            ip: row.4,
            issued_at: row.5,
            expires_at: row.6,
            parent_id: row.7,
            revoked: row.8,
            revoked_at: row.9,
        }
    }
}

impl From<TokenRow> for RefreshTokenRecord {
    fn from(row: TokenRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token_hash: row.token_hash,
            user_agent: row.user_agent,
            ip: row.ip,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            parent_id: row.parent_id,
            revoked: row.revoked,
            revoked_at: row.revoked_at,
        }
    }
}

// =============================================================================
// Token Storage
// =============================================================================

/// Refresh token storage operations over a borrowed pool.
pub struct TokenStorage<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenStorage<'a> {
    /// Create a new token storage with a connection pool reference.
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id or digest already exists,
    /// or a database error.
    pub async fn create(&self, record: &RefreshTokenRecord) -> StorageResult<()> {
        insert_record(self.pool, record).await
    }

    /// Revoke `parent_id` and insert `child` in one transaction.
    ///
    /// Holds the owner's advisory lock, so a concurrent
    /// [`revoke_by_user`](Self::revoke_by_user) runs either before (the
    /// parent is already revoked and nothing is inserted) or after (the child
    /// is visible to it and gets revoked).
    ///
    /// # Returns
    ///
    /// `true` if the parent was active and the child was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if a statement fails. The transaction is rolled back.
    pub async fn rotate(&self, parent_id: Uuid, child: &RefreshTokenRecord) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, child.user_id).await?;

        let result = query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE, revoked_at = NOW()
            WHERE id = $1
              AND user_id = $2
              AND revoked = FALSE
            "#,
        )
        .bind(parent_id)
        .bind(child.user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_record(&mut *tx, child).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Find a record by the digest of its secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_hash(&self, token_hash: &str) -> StorageResult<Option<TokenRow>> {
        let sql = format!("SELECT {COLUMNS} FROM refresh_tokens WHERE token_hash = $1");
        let row: Option<TokenTuple> = query_as(&sql)
            .bind(token_hash)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(TokenRow::from_tuple))
    }

    /// Revoke a record if it is still active.
    ///
    /// The `revoked = FALSE` predicate makes this a compare-and-set: of any
    /// number of concurrent calls, exactly one updates the row.
    ///
    /// # Returns
    ///
    /// `true` if this call revoked the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke(&self, id: Uuid) -> StorageResult<bool> {
        let result = query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE, revoked_at = NOW()
            WHERE id = $1
              AND revoked = FALSE
            "#,
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Revoke every active record of a user.
    ///
    /// Takes the same advisory lock as [`rotate`](Self::rotate).
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn revoke_by_user(&self, user_id: Uuid) -> StorageResult<u64> {
        let mut tx = self.pool.begin().await?;
        lock_user(&mut tx, user_id).await?;

        let result = query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE, revoked_at = NOW()
            WHERE user_id = $1
              AND revoked = FALSE
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// List a user's active records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_active_by_user(&self, user_id: Uuid) -> StorageResult<Vec<TokenRow>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM refresh_tokens \
             WHERE user_id = $1 AND revoked = FALSE AND expires_at > NOW() \
             ORDER BY issued_at DESC"
        );
        let rows: Vec<TokenTuple> = query_as(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(TokenRow::from_tuple).collect())
    }
}

/// Serializes rotation and mass revocation of one user until commit.
async fn lock_user(conn: &mut PgConnection, user_id: Uuid) -> StorageResult<()> {
    query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn insert_record<'e, E>(executor: E, record: &RefreshTokenRecord) -> StorageResult<()>
where
    E: Executor<'e, Database = Postgres>,
{
    if record.token_hash.is_empty() {
        return Err(StorageError::invalid_input("token_hash must not be empty"));
    }

    query(
        r#"
        INSERT INTO refresh_tokens
            (id, user_id, token_hash, user_agent, ip, issued_at, expires_at, parent_id, revoked, revoked_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(record.id)
    .bind(record.user_id)
    .bind(&record.token_hash)
    .bind(&record.user_agent)
    .bind(&record.ip)
    .bind(record.issued_at)
    .bind(record.expires_at)
    .bind(record.parent_id)
    .bind(record.revoked)
    .bind(record.revoked_at)
    .execute(executor)
    .await
    .map_err(|e| {
        if let sqlx_core::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return StorageError::conflict(format!("refresh token {} already exists", record.id));
        }
        StorageError::from(e)
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_row_converts_to_record() {
        let now = OffsetDateTime::now_utc();
        let parent = Uuid::new_v4();
        let tuple: TokenTuple = (
            Uuid::new_v4(),
            Uuid::new_v4(),
            "ab".repeat(32),
            "curl/8.0".to_string(),
            "10.0.0.1".to_string(),
            now,
            now + Duration::days(30),
            Some(parent),
            true,
            Some(now),
        );

        let row = TokenRow::from_tuple(tuple.clone());
        let record = RefreshTokenRecord::from(row);

        assert_eq!(record.id, tuple.0);
        assert_eq!(record.user_id, tuple.1);
        assert_eq!(record.token_hash, tuple.2);
        assert_eq!(record.parent_id, Some(parent));
        assert!(record.revoked);
        assert_eq!(record.revoked_at, Some(now));
    }

    #[test]
    fn test_select_columns_match_tuple_arity() {
        assert_eq!(COLUMNS.split(',').count(), 10);
    }
}
