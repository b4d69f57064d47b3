//! Property-based tests for the whitelist gate
//!
//! Tests for:
//! - Decision: privileged bypass, allow iff cached
//! - Mutations: grant/revoke sequences keep cache and store in lockstep

use super::*;
use crate::audit::RecordingSink;
use crate::store::MemoryMembershipStore;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::BTreeSet;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,12}"
}

/// Gate hydrated with `keys` already whitelisted.
async fn seeded_gate(keys: &BTreeSet<String>) -> (WhitelistGate, MemoryMembershipStore) {
    let store = MemoryMembershipStore::new();
    for raw in keys {
        store.put(WhitelistRecord::new(
            RealmId::new("1"),
            IdentityKey::parse(raw).unwrap(),
            "seed",
        ));
    }
    let (notifier, _worker) = AuditNotifier::spawn(Arc::new(RecordingSink::new()));
    let gate = WhitelistGate::hydrate(RealmId::new("1"), Arc::new(store.clone()), notifier)
        .await
        .unwrap();
    (gate, store)
}

#[derive(Debug, Clone)]
enum Op {
    Grant(String),
    Revoke(String),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    // Small key space so grants and revokes collide often.
    let key = prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(str::to_string);
    prop_oneof![
        key.clone().prop_map(Op::Grant),
        key.prop_map(Op::Revoke),
    ]
}

proptest! {
    /// Property: privileged identities are admitted whatever the cache holds.
    #[test]
    fn privileged_always_allowed(
        cached in prop::collection::btree_set(key_strategy(), 0..8),
        raw_key in ".{0,16}",
    ) {
        let rt = runtime();
        let (gate, _store) = rt.block_on(seeded_gate(&cached));

        let verdict = gate.evaluate(&Identity::privileged(raw_key, "Admin"));
        prop_assert_eq!(verdict, Verdict::Allowed(AllowReason::Privileged));
    }

    /// Property: a non-privileged identity is admitted iff its key is cached.
    #[test]
    fn allowed_iff_cached(
        cached in prop::collection::btree_set(key_strategy(), 0..8),
        candidate in key_strategy(),
        display_name in "[A-Za-z ]{0,16}",
    ) {
        let rt = runtime();
        let (gate, _store) = rt.block_on(seeded_gate(&cached));

        let verdict = gate.evaluate(&Identity::new(candidate.clone(), display_name));
        prop_assert_eq!(verdict.is_allowed(), cached.contains(&candidate));
    }

    /// Property: any grant/revoke sequence leaves cache keys equal to store
    /// contents, and each result matches the idempotence contract.
    #[test]
    fn mutations_keep_cache_and_store_coherent(
        ops in prop::collection::vec(op_strategy(), 0..24),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let (gate, store) = seeded_gate(&BTreeSet::new()).await;
            let mut model: BTreeSet<String> = BTreeSet::new();

            for op in ops {
                match op {
                    Op::Grant(raw) => {
                        let key = IdentityKey::parse(&raw).unwrap();
                        let result = gate.grant(key, "admin").await;
                        prop_assert_eq!(result.is_ok(), model.insert(raw));
                    }
                    Op::Revoke(raw) => {
                        let key = IdentityKey::parse(&raw).unwrap();
                        let result = gate.revoke(key, "admin").await;
                        prop_assert_eq!(result.is_ok(), model.remove(&raw));
                    }
                }
            }

            let cached: BTreeSet<String> =
                gate.cache().keys().into_iter().map(String::from).collect();
            prop_assert_eq!(&cached, &model);

            let persisted: BTreeSet<String> = store
                .load_all(&RealmId::new("1"))
                .await
                .unwrap()
                .into_iter()
                .map(|r| String::from(r.identity_key))
                .collect();
            prop_assert_eq!(&persisted, &model);
            Ok::<(), TestCaseError>(())
        })?;
    }
}
