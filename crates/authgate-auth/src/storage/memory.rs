//! In-memory refresh token storage.
//!
//! Records live in a [`DashMap`] keyed by id with a secondary digest index.
//! Revocation takes the shard write lock for the single record being changed,
//! which makes it a compare-and-set without any global lock. Rotation and
//! mass revocation additionally hold a per-user entry in `user_locks`.
//!
//! Lock order is `user_locks`, then `by_hash`, then `records`.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::storage::RefreshTokenStorage;
use crate::types::RefreshTokenRecord;
use crate::{AuthError, AuthResult};

/// Refresh token storage held entirely in process memory.
///
/// Contents are lost on restart. Suitable for tests and single-instance
/// deployments.
#[derive(Debug, Default)]
pub struct MemoryRefreshTokenStorage {
    records: DashMap<Uuid, RefreshTokenRecord>,
    by_hash: DashMap<String, Uuid>,
    user_locks: DashMap<Uuid, ()>,
}

impl MemoryRefreshTokenStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, revoked ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fetches a record by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<RefreshTokenRecord> {
        self.records.get(&id).map(|r| r.value().clone())
    }
}

#[async_trait]
impl RefreshTokenStorage for MemoryRefreshTokenStorage {
    async fn create(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
        match self.by_hash.entry(record.token_hash.clone()) {
            Entry::Occupied(_) => Err(AuthError::internal("duplicate refresh token hash")),
            Entry::Vacant(slot) => {
                self.records.insert(record.id, record.clone());
                slot.insert(record.id);
                Ok(())
            }
        }
    }

    async fn find_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshTokenRecord>> {
        let Some(id) = self.by_hash.get(token_hash).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self.get(id))
    }

    async fn revoke(&self, id: Uuid) -> AuthResult<bool> {
        let Some(mut record) = self.records.get_mut(&id) else {
            return Ok(false);
        };
        if record.revoked {
            return Ok(false);
        }
        record.revoked = true;
        record.revoked_at = Some(OffsetDateTime::now_utc());
        Ok(true)
    }

    async fn rotate(&self, parent_id: Uuid, child: &RefreshTokenRecord) -> AuthResult<bool> {
        let _user = self.user_locks.entry(child.user_id).or_default();

        let Entry::Vacant(slot) = self.by_hash.entry(child.token_hash.clone()) else {
            return Err(AuthError::internal("duplicate refresh token hash"));
        };

        {
            let Some(mut parent) = self.records.get_mut(&parent_id) else {
                return Ok(false);
            };
            if parent.revoked || parent.user_id != child.user_id {
                return Ok(false);
            }
            parent.revoked = true;
            parent.revoked_at = Some(OffsetDateTime::now_utc());
        }

        self.records.insert(child.id, child.clone());
        slot.insert(child.id);
        Ok(true)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> AuthResult<u64> {
        let _user = self.user_locks.entry(user_id).or_default();
        let now = OffsetDateTime::now_utc();
        let mut count = 0;
        for mut record in self.records.iter_mut() {
            if record.user_id == user_id && !record.revoked {
                record.revoked = true;
                record.revoked_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn list_active_for_user(&self, user_id: Uuid) -> AuthResult<Vec<RefreshTokenRecord>> {
        let now = OffsetDateTime::now_utc();
        let mut active: Vec<RefreshTokenRecord> = self
            .records
            .iter()
            .filter(|r| r.user_id == user_id && r.is_active_at(now))
            .map(|r| r.value().clone())
            .collect();
        active.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(active)
    }
}
