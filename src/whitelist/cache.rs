//! Process-local membership cache
//!
//! Every login decision reads this map and nothing else, so `contains` must
//! never touch I/O. Writes take the map's write lock with a fully built
//! record, so readers see either no entry or the complete entry.
//!
//! A poisoned lock fails closed: lookups report "not present" and mutations
//! return `CacheError::Poisoned`.

use super::types::{IdentityKey, RealmId, WhitelistRecord};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("{0} is already in the membership cache")]
    AlreadyExists(IdentityKey),

    #[error("{0} is not in the membership cache")]
    NotFound(IdentityKey),

    #[error("record belongs to realm {found}, cache serves realm {expected}")]
    WrongRealm { expected: RealmId, found: RealmId },

    #[error("membership cache lock poisoned")]
    Poisoned,
}

/// Identity key → record map for one realm.
///
/// Outside this crate the cache is read-only. Every write goes through
/// `WhitelistGate::grant`/`revoke`, which update the store first, so the
/// cached keys stay equal to the persisted keys:
///
/// ```compile_fail
/// use gatehouse::{IdentityKey, RealmId, WhitelistGate, WhitelistRecord};
///
/// fn sneak_in(gate: &WhitelistGate) {
///     let key = IdentityKey::parse("intruder").unwrap();
///     let record = WhitelistRecord::new(RealmId::new("1"), key, "nobody");
///     let _ = gate.cache().insert(record);
/// }
/// ```
///
/// ```compile_fail
/// use gatehouse::WhitelistGate;
///
/// fn wipe(gate: &WhitelistGate) {
///     let _ = gate.cache().hydrate(Vec::new());
/// }
/// ```
///
/// ```compile_fail
/// use gatehouse::{IdentityKey, WhitelistGate};
///
/// fn evict(gate: &WhitelistGate) {
///     let _ = gate.cache().remove(&IdentityKey::parse("abc").unwrap());
/// }
/// ```
///
/// Reads stay available:
///
/// ```
/// use gatehouse::{IdentityKey, WhitelistGate};
///
/// fn is_listed(gate: &WhitelistGate, raw: &str) -> bool {
///     IdentityKey::parse(raw)
///         .map(|key| gate.cache().contains(&key))
///         .unwrap_or(false)
/// }
/// ```
#[derive(Debug)]
pub struct MembershipCache {
    realm: RealmId,
    entries: RwLock<HashMap<IdentityKey, WhitelistRecord>>,
}

impl MembershipCache {
    pub(crate) fn new(realm: RealmId) -> Self {
        Self {
            realm,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn realm(&self) -> &RealmId {
        &self.realm
    }

    /// Replace the whole mapping with `records`.
    ///
    /// Records scoped to another realm are skipped. Must finish before the
    /// gate serves any decision.
    pub(crate) fn hydrate(
        &self,
        records: impl IntoIterator<Item = WhitelistRecord>,
    ) -> Result<usize, CacheError> {
        let mut fresh = HashMap::new();
        for record in records {
            if record.realm_id != self.realm {
                warn!(
                    realm = %record.realm_id,
                    identity_key = %record.identity_key,
                    "skipping whitelist record from foreign realm"
                );
                continue;
            }
            fresh.insert(record.identity_key.clone(), record);
        }

        let count = fresh.len();
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        *entries = fresh;
        debug!(realm = %self.realm, count, "membership cache hydrated");
        Ok(count)
    }

    /// Hot-path membership check.
    pub fn contains(&self, key: &IdentityKey) -> bool {
        match self.entries.read() {
            Ok(entries) => entries.contains_key(key),
            Err(_) => {
                warn!(identity_key = %key, "membership cache poisoned, denying");
                false
            }
        }
    }

    pub fn get(&self, key: &IdentityKey) -> Option<WhitelistRecord> {
        self.entries.read().ok()?.get(key).cloned()
    }

    pub(crate) fn insert(&self, record: WhitelistRecord) -> Result<(), CacheError> {
        if record.realm_id != self.realm {
            return Err(CacheError::WrongRealm {
                expected: self.realm.clone(),
                found: record.realm_id,
            });
        }

        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        if entries.contains_key(&record.identity_key) {
            return Err(CacheError::AlreadyExists(record.identity_key));
        }
        entries.insert(record.identity_key.clone(), record);
        Ok(())
    }

    pub(crate) fn remove(&self, key: &IdentityKey) -> Result<WhitelistRecord, CacheError> {
        let mut entries = self.entries.write().map_err(|_| CacheError::Poisoned)?;
        entries
            .remove(key)
            .ok_or_else(|| CacheError::NotFound(key.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted snapshot of cached keys.
    pub fn keys(&self) -> Vec<IdentityKey> {
        let mut keys: Vec<IdentityKey> = match self.entries.read() {
            Ok(entries) => entries.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        keys.sort();
        keys
    }
}
