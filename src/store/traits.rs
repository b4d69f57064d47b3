//! Trait abstraction for the durable whitelist store.
//!
//! The gate only ever reaches persistence through `MembershipStore`, which
//! lets tests swap in `MemoryMembershipStore`.

use crate::whitelist::{IdentityKey, RealmId, WhitelistRecord};
use async_trait::async_trait;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record in store: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Durable keyed-record store, scoped by realm.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Every record for `realm`. Only used at hydration time.
    async fn load_all(&self, realm: &RealmId) -> StoreResult<Vec<WhitelistRecord>>;

    /// Persist a record. Duplicate keys are tolerated, not reported.
    async fn insert_record(&self, record: &WhitelistRecord) -> StoreResult<()>;

    /// Delete a record. Deleting an absent record is a no-op.
    async fn delete_record(&self, realm: &RealmId, key: &IdentityKey) -> StoreResult<()>;

    /// Number of persisted records for `realm`.
    async fn count(&self, realm: &RealmId) -> StoreResult<u64>;
}
