//! Membership store adapter: the gate's only path to persistence.

pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::MemoryMembershipStore;
pub use sqlite::SqliteMembershipStore;
pub use traits::{MembershipStore, StoreError, StoreResult};
