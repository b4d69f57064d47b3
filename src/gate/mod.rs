//! Whitelist Gate: login admission and the membership mutation protocol
//!
//! Decision per login attempt, evaluated once:
//! 1. privileged identity → allowed
//! 2. malformed identity key → denied (fail closed)
//! 3. key in the membership cache → allowed
//! 4. otherwise → denied
//!
//! The decision only reads the cache. Client notices and audit messages are
//! emitted after it and cannot change it.
//!
//! Mutations write the store first and the cache second, under one async
//! lock per gate, so a crash in between leaves the store (source of truth)
//! ahead and the next hydration catches the cache up.

pub mod error;
#[cfg(test)]
mod proptests;

pub use error::{GateError, GateResult};

use crate::audit::{AuditEvent, AuditNotifier};
use crate::hooks::{HookPhase, HookRegistry, HookSignal};
use crate::store::MembershipStore;
use crate::whitelist::{
    AllowReason, DenyReason, Identity, IdentityKey, MembershipCache, RealmId, Verdict,
    WhitelistRecord,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Priority the gate registers its login hook at. Low values run first.
pub const GATE_HOOK_PRIORITY: i32 = -100;

/// Name the gate registers its login hook under.
pub const GATE_HOOK_NAME: &str = "whitelist";

/// Console message shown to a connecting client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientNotice {
    pub text: String,
    /// Pop the client console open.
    pub show_console: bool,
    /// Clear earlier console output first.
    pub clear_output: bool,
}

/// Host primitive for messaging a connecting client.
///
/// Delivery is the host's concern; the gate does not wait on it.
pub trait ClientChannel: Send + Sync {
    fn send_notice(&self, identity: &Identity, notice: ClientNotice);
}

pub struct WhitelistGate {
    realm: RealmId,
    cache: Arc<MembershipCache>,
    store: Arc<dyn MembershipStore>,
    notifier: AuditNotifier,
    mutation: Mutex<()>,
}

impl WhitelistGate {
    /// Load the realm's whitelist and build the gate.
    ///
    /// This is the only constructor, so no decision can be served before
    /// hydration has completed.
    pub async fn hydrate(
        realm: RealmId,
        store: Arc<dyn MembershipStore>,
        notifier: AuditNotifier,
    ) -> GateResult<Self> {
        let records = store.load_all(&realm).await?;
        let cache = Arc::new(MembershipCache::new(realm.clone()));
        let count = cache.hydrate(records)?;
        info!(realm = %realm, count, "whitelist loaded");

        Ok(Self {
            realm,
            cache,
            store,
            notifier,
            mutation: Mutex::new(()),
        })
    }

    pub fn realm(&self) -> &RealmId {
        &self.realm
    }

    /// Read access to the membership cache. Writes only happen through
    /// `grant` and `revoke`.
    pub fn cache(&self) -> &Arc<MembershipCache> {
        &self.cache
    }

    pub fn notifier(&self) -> &AuditNotifier {
        &self.notifier
    }

    /// Pure decision. Never blocks on I/O.
    pub fn evaluate(&self, identity: &Identity) -> Verdict {
        if identity.is_privileged {
            return Verdict::Allowed(AllowReason::Privileged);
        }
        let key = match identity.key() {
            Ok(key) => key,
            Err(_) => return Verdict::Denied(DenyReason::MalformedIdentity),
        };
        if self.cache.contains(&key) {
            Verdict::Allowed(AllowReason::Whitelisted)
        } else {
            Verdict::Denied(DenyReason::NotWhitelisted)
        }
    }

    /// Login interception: decide, then emit side effects.
    ///
    /// Returns `ShortCircuit` on deny so the host skips its default login
    /// continuation.
    pub fn on_login(&self, identity: &Identity, channel: &dyn ClientChannel) -> HookSignal {
        let verdict = self.evaluate(identity);
        let raw_key = identity.identity_key.trim();
        let label = identity.audit_label();

        match verdict {
            Verdict::Allowed(reason) => {
                info!(identity_key = %raw_key, ?reason, "whitelist admit");
                self.notifier
                    .notify(AuditEvent::connected(label, &identity.display_name));
                HookSignal::Continue
            }
            Verdict::Denied(reason) => {
                info!(identity_key = %raw_key, ?reason, "whitelist reject");
                for notice in deny_notices(raw_key) {
                    channel.send_notice(identity, notice);
                }
                self.notifier
                    .notify(AuditEvent::rejected(label, &identity.display_name));
                HookSignal::ShortCircuit
            }
        }
    }

    /// Register `on_login` as a before-hook on the host's login point.
    pub fn install(
        self: &Arc<Self>,
        registry: &mut HookRegistry<Identity>,
        channel: Arc<dyn ClientChannel>,
    ) {
        let gate = Arc::clone(self);
        registry.register(
            HookPhase::Before,
            GATE_HOOK_PRIORITY,
            GATE_HOOK_NAME,
            move |identity: &Identity| gate.on_login(identity, channel.as_ref()),
        );
    }

    /// Add `key` to the whitelist on behalf of `granted_by`.
    pub async fn grant(&self, key: IdentityKey, granted_by: &str) -> GateResult<WhitelistRecord> {
        let _guard = self.mutation.lock().await;

        if self.cache.contains(&key) {
            return Err(GateError::AlreadyWhitelisted(key));
        }

        let record = WhitelistRecord::new(self.realm.clone(), key, granted_by);
        self.store.insert_record(&record).await?;
        if let Err(e) = self.cache.insert(record.clone()) {
            warn!(
                identity_key = %record.identity_key,
                error = %e,
                "cache write failed after store insert"
            );
            return Err(e.into());
        }

        info!(identity_key = %record.identity_key, granted_by, "identity whitelisted");
        self.notifier
            .notify(AuditEvent::granted(&record.identity_key, granted_by));
        Ok(record)
    }

    /// Remove `key` from the whitelist on behalf of `revoked_by`.
    pub async fn revoke(&self, key: IdentityKey, revoked_by: &str) -> GateResult<WhitelistRecord> {
        let _guard = self.mutation.lock().await;

        if !self.cache.contains(&key) {
            return Err(GateError::NotWhitelisted(key));
        }

        self.store.delete_record(&self.realm, &key).await?;
        let record = match self.cache.remove(&key) {
            Ok(record) => record,
            Err(e) => {
                warn!(identity_key = %key, error = %e, "cache write failed after store delete");
                return Err(e.into());
            }
        };

        info!(identity_key = %key, revoked_by, "identity removed from whitelist");
        self.notifier.notify(AuditEvent::revoked(&key, revoked_by));
        Ok(record)
    }

    /// Whitelist size as persisted, read from the store rather than the cache.
    pub async fn persisted_count(&self) -> GateResult<u64> {
        Ok(self.store.count(&self.realm).await?)
    }
}

/// The two notices sent to a rejected client: the key to whitelist, then
/// the instruction to reconnect.
fn deny_notices(identity_key: &str) -> [ClientNotice; 2] {
    [
        ClientNotice {
            text: format!(
                "You must be whitelisted to join this server! Your identity key: {}",
                identity_key
            ),
            show_console: true,
            clear_output: true,
        },
        ClientNotice {
            text: "Ask an administrator to whitelist this key, then reconnect.".to_string(),
            show_console: true,
            clear_output: false,
        },
    ]
}
