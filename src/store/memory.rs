//! In-process membership store.
//!
//! Used by tests and by `gatehouse run` when no database path is configured.
//! `set_unavailable` makes every call fail, to exercise store outages.

use super::traits::*;
use crate::whitelist::{IdentityKey, RealmId, WhitelistRecord};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MemoryMembershipStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    records: BTreeMap<(RealmId, IdentityKey), WhitelistRecord>,
    unavailable: bool,
    inserts: usize,
    deletes: usize,
}

impl MemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly (test setup).
    pub fn put(&self, record: WhitelistRecord) {
        let mut state = self.lock();
        state.records.insert(
            (record.realm_id.clone(), record.identity_key.clone()),
            record,
        );
    }

    /// Simulate the backing store going away (or coming back).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Number of `insert_record` calls that reached the store.
    pub fn insert_calls(&self) -> usize {
        self.lock().inserts
    }

    /// Number of `delete_record` calls that reached the store.
    pub fn delete_calls(&self) -> usize {
        self.lock().deletes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A panic while holding this lock can only come from a test; keep serving.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn available(&self) -> StoreResult<std::sync::MutexGuard<'_, MemoryState>> {
        let state = self.lock();
        if state.unavailable {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(state)
    }
}

#[async_trait]
impl MembershipStore for MemoryMembershipStore {
    async fn load_all(&self, realm: &RealmId) -> StoreResult<Vec<WhitelistRecord>> {
        let state = self.available()?;
        Ok(state
            .records
            .values()
            .filter(|r| &r.realm_id == realm)
            .cloned()
            .collect())
    }

    async fn insert_record(&self, record: &WhitelistRecord) -> StoreResult<()> {
        let mut state = self.available()?;
        state.inserts += 1;
        state
            .records
            .entry((record.realm_id.clone(), record.identity_key.clone()))
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn delete_record(&self, realm: &RealmId, key: &IdentityKey) -> StoreResult<()> {
        let mut state = self.available()?;
        state.deletes += 1;
        state.records.remove(&(realm.clone(), key.clone()));
        Ok(())
    }

    async fn count(&self, realm: &RealmId) -> StoreResult<u64> {
        let state = self.available()?;
        Ok(state.records.keys().filter(|(r, _)| r == realm).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(realm: &str, key: &str) -> WhitelistRecord {
        WhitelistRecord::new(
            RealmId::new(realm),
            IdentityKey::parse(key).unwrap(),
            "admin",
        )
    }

    #[tokio::test]
    async fn test_load_all_scoped_by_realm() {
        let store = MemoryMembershipStore::new();
        store.put(record("1", "abc"));
        store.put(record("2", "def"));

        let loaded = store.load_all(&RealmId::new("1")).await.unwrap();
        assert_eq!(loaded, vec![record("1", "abc")]);
        assert_eq!(store.count(&RealmId::new("2")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_tolerated() {
        let store = MemoryMembershipStore::new();
        store.insert_record(&record("1", "abc")).await.unwrap();
        store.insert_record(&record("1", "abc")).await.unwrap();

        assert_eq!(store.count(&RealmId::new("1")).await.unwrap(), 1);
        assert_eq!(store.insert_calls(), 2);
    }

    #[tokio::test]
    async fn test_delete_absent_is_noop() {
        let store = MemoryMembershipStore::new();
        let key = IdentityKey::parse("ghost").unwrap();
        store.delete_record(&RealmId::new("1"), &key).await.unwrap();
        assert_eq!(store.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryMembershipStore::new();
        store.set_unavailable(true);

        let err = store.insert_record(&record("1", "abc")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.set_unavailable(false);
        store.insert_record(&record("1", "abc")).await.unwrap();
    }
}
