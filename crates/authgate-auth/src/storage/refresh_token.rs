//! Refresh token storage trait.
//!
//! # Consistency
//!
//! Replay detection depends on two properties of the backend:
//!
//! - When two callers race to revoke the same record, exactly one of them
//!   performs the `revoked = false -> true` transition and learns that it
//!   did. [`RefreshTokenStorage::revoke`] and [`RefreshTokenStorage::rotate`]
//!   are compare-and-sets scoped to that single record.
//! - [`RefreshTokenStorage::rotate`] and
//!   [`RefreshTokenStorage::revoke_all_for_user`] are serialized per user. A
//!   child stored by a rotation is therefore never left active by a mass
//!   revocation that ran concurrently with it.

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::RefreshTokenRecord;

/// Storage trait for refresh token records.
///
/// # Implementations
///
/// - [`MemoryRefreshTokenStorage`](crate::storage::MemoryRefreshTokenStorage) - in-process, for tests and single-node use
/// - `authgate-auth-postgres` - PostgreSQL storage backend
///
/// Backend failures are reported as `AuthError::StorageUnavailable`. The
/// session manager does not retry them.
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Stores a new refresh token record.
    ///
    /// # Arguments
    ///
    /// * `record` - The record to store (with hashed secret)
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored (duplicate hash,
    /// storage unavailable).
    async fn create(&self, record: &RefreshTokenRecord) -> AuthResult<()>;

    /// Finds a record by the digest of its secret.
    ///
    /// Returns records regardless of expiry or revocation; the caller decides
    /// what a revoked or expired record means.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenRecord>>;

    /// Marks a record revoked.
    ///
    /// Idempotent: revoking an already revoked or unknown record is not an
    /// error.
    ///
    /// # Returns
    ///
    /// `true` only for the call that moved the record from active to
    /// revoked. Every other call, concurrent or later, gets `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke(&self, id: Uuid) -> AuthResult<bool>;

    /// Revokes `parent_id` and stores `child` as one atomic step.
    ///
    /// The child is only stored if this call moved the parent from active to
    /// revoked. Must not interleave with
    /// [`revoke_all_for_user`](Self::revoke_all_for_user) for the same user.
    ///
    /// # Returns
    ///
    /// `true` if the parent was consumed and the child stored, `false` if the
    /// parent was already revoked (nothing is stored).
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails. Nothing is changed then.
    async fn rotate(&self, parent_id: Uuid, child: &RefreshTokenRecord) -> AuthResult<bool>;

    /// Revokes every active record owned by a user.
    ///
    /// Used on logout and when replay of a consumed token is detected.
    ///
    /// # Returns
    ///
    /// The number of records this call revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> AuthResult<u64>;

    /// Lists a user's active (non-revoked, non-expired) records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn list_active_for_user(&self, user_id: Uuid) -> AuthResult<Vec<RefreshTokenRecord>>;
}
