//! Whitelist data model and in-memory membership cache.

pub mod cache;
pub mod types;

pub use cache::{CacheError, MembershipCache};
pub use types::{
    AllowReason, DenyReason, Identity, IdentityKey, IdentityKeyError, RealmId, Verdict,
    WhitelistRecord, UNKNOWN_IDENTITY,
};
