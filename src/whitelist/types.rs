//! Whitelist data model.
//!
//! Records are keyed by a persistent identity key, never by a display name,
//! so renaming a character cannot move it on or off the whitelist.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest identity key accepted from the host or from a command.
pub const MAX_IDENTITY_KEY_LEN: usize = 128;

/// Audit label for an identity carrying neither a key nor a name.
pub const UNKNOWN_IDENTITY: &str = "<unknown>";

/// Realm (server/world partition) a whitelist belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RealmId(String);

impl RealmId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u32> for RealmId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RealmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a raw identity key was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityKeyError {
    #[error("identity key is empty")]
    Empty,

    #[error("identity key contains whitespace")]
    Whitespace,

    #[error("identity key is longer than {MAX_IDENTITY_KEY_LEN} bytes")]
    TooLong,
}

/// Stable, rename-proof identifier of a connecting principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Validate a raw key. Surrounding whitespace is trimmed first.
    pub fn parse(raw: &str) -> Result<Self, IdentityKeyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentityKeyError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(IdentityKeyError::Whitespace);
        }
        if trimmed.len() > MAX_IDENTITY_KEY_LEN {
            return Err(IdentityKeyError::TooLong);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdentityKey {
    type Error = IdentityKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IdentityKey> for String {
    fn from(key: IdentityKey) -> Self {
        key.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One durable whitelist entry.
///
/// Created by a grant, deleted by a revoke, never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistRecord {
    pub realm_id: RealmId,
    pub identity_key: IdentityKey,
    /// Administrator who granted access (audit only, not used in decisions).
    pub granted_by: String,
}

impl WhitelistRecord {
    pub fn new(
        realm_id: RealmId,
        identity_key: IdentityKey,
        granted_by: impl Into<String>,
    ) -> Self {
        Self {
            realm_id,
            identity_key,
            granted_by: granted_by.into(),
        }
    }
}

/// A connecting principal as reported by the host.
///
/// The key is kept raw: the host may hand us garbage and the gate has to
/// fail closed on it rather than refuse to construct the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub identity_key: String,
    pub display_name: String,
    pub is_privileged: bool,
}

impl Identity {
    pub fn new(identity_key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identity_key: identity_key.into(),
            display_name: display_name.into(),
            is_privileged: false,
        }
    }

    /// Administrator/operator identity that bypasses the whitelist.
    pub fn privileged(identity_key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            is_privileged: true,
            ..Self::new(identity_key, display_name)
        }
    }

    pub fn key(&self) -> Result<IdentityKey, IdentityKeyError> {
        IdentityKey::parse(&self.identity_key)
    }

    /// Name used in audit text and `granted_by`: the trimmed key, else the
    /// display name, else `UNKNOWN_IDENTITY`.
    pub fn audit_label(&self) -> &str {
        [self.identity_key.trim(), self.display_name.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_IDENTITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowReason {
    Privileged,
    Whitelisted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotWhitelisted,
    MalformedIdentity,
}

/// Terminal outcome of one login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed(AllowReason),
    Denied(DenyReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed(_))
    }
}
