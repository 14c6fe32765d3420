//! Table definition for refresh token records.

use sqlx_core::query::query;

use crate::{PgPool, StorageResult};

/// DDL statements applied by [`ensure_schema`], in order. Each is idempotent.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        id          UUID PRIMARY KEY,
        user_id     UUID NOT NULL,
        token_hash  TEXT NOT NULL,
        user_agent  TEXT NOT NULL DEFAULT '',
        ip          TEXT NOT NULL DEFAULT '',
        issued_at   TIMESTAMPTZ NOT NULL,
        expires_at  TIMESTAMPTZ NOT NULL,
        parent_id   UUID NULL,
        revoked     BOOLEAN NOT NULL DEFAULT FALSE,
        revoked_at  TIMESTAMPTZ NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS refresh_tokens_token_hash_idx ON refresh_tokens (token_hash)",
    "CREATE INDEX IF NOT EXISTS refresh_tokens_user_id_idx ON refresh_tokens (user_id)",
];

/// Creates the `refresh_tokens` table and its indexes if missing.
///
/// # Errors
///
/// Returns an error if a statement fails.
pub async fn ensure_schema(pool: &PgPool) -> StorageResult<()> {
    for statement in SCHEMA_STATEMENTS {
        query(statement).execute(pool).await?;
    }
    tracing::debug!("refresh_tokens schema ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent_ddl() {
        for statement in SCHEMA_STATEMENTS {
            assert!(statement.contains("IF NOT EXISTS"), "{statement}");
        }
    }

    #[test]
    fn test_token_hash_is_unique() {
        assert!(
            SCHEMA_STATEMENTS
                .iter()
                .any(|s| s.contains("UNIQUE INDEX") && s.contains("token_hash"))
        );
    }
}
