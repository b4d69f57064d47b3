//! Gatehouse - Whitelist Gate
//!
//! Decides at connection time whether an identity may enter a session,
//! based on an administrator-maintained whitelist.
//!
//! Key principles:
//! - Whitelist keyed by persistent identity keys, never display names
//! - Login decisions read only the in-memory cache and never block on I/O
//! - Store is the source of truth; the cache is rebuilt from it at startup
//! - Audit delivery is best-effort and off the decision path

pub mod audit;
pub mod commands;
pub mod gate;
pub mod hooks;
pub mod store;
pub mod whitelist;

pub use commands::{AdminCommand, AdminCommands, Responder};
pub use gate::{ClientChannel, ClientNotice, GateError, WhitelistGate};
pub use hooks::{HookOutcome, HookRegistry, HookSignal};
pub use whitelist::{Identity, IdentityKey, RealmId, Verdict, WhitelistRecord};
