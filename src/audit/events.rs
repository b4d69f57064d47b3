//! Audit events
//!
//! Human-readable one-liners for the join-log sink. Connection events use
//! the identity key so an administrator can copy it straight into a grant.

use crate::whitelist::IdentityKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    /// Login admitted (whitelisted or privileged).
    Connected,
    /// Login refused by the whitelist.
    Rejected,
    /// Administrator added an identity.
    Granted { by: String },
    /// Administrator removed an identity.
    Revoked { by: String },
}

/// Single audit event, stamped on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unix timestamp (seconds since epoch).
    pub timestamp: u64,
    pub identity_key: String,
    /// Display name at the time of the event, if known. Informational only.
    pub display_name: Option<String>,
    pub action: AuditAction,
}

impl AuditEvent {
    fn new(identity_key: String, display_name: Option<String>, action: AuditAction) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            timestamp,
            identity_key,
            display_name,
            action,
        }
    }

    /// Raw key on purpose: a malformed key still has to show up in the log.
    pub fn connected(identity_key: &str, display_name: &str) -> Self {
        Self::new(
            identity_key.to_string(),
            Some(display_name.to_string()),
            AuditAction::Connected,
        )
    }

    pub fn rejected(identity_key: &str, display_name: &str) -> Self {
        Self::new(
            identity_key.to_string(),
            Some(display_name.to_string()),
            AuditAction::Rejected,
        )
    }

    pub fn granted(identity_key: &IdentityKey, by: &str) -> Self {
        Self::new(
            identity_key.to_string(),
            None,
            AuditAction::Granted { by: by.to_string() },
        )
    }

    pub fn revoked(identity_key: &IdentityKey, by: &str) -> Self {
        Self::new(
            identity_key.to_string(),
            None,
            AuditAction::Revoked { by: by.to_string() },
        )
    }

    /// Text delivered to the sink.
    pub fn message(&self) -> String {
        let who = match &self.display_name {
            Some(name) if !name.is_empty() && name != &self.identity_key => {
                format!("{} ({})", self.identity_key, name)
            }
            _ => self.identity_key.clone(),
        };

        match &self.action {
            AuditAction::Connected => format!("{} connected.", who),
            AuditAction::Rejected => format!("{} connection rejected.", who),
            AuditAction::Granted { by } => format!("{} whitelisted {}.", by, who),
            AuditAction::Revoked { by } => {
                format!("{} removed {} from the whitelist.", by, who)
            }
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_messages() {
        assert_eq!(
            AuditEvent::connected("abc", "abc").message(),
            "abc connected."
        );
        assert_eq!(
            AuditEvent::rejected("abc", "Survivor").message(),
            "abc (Survivor) connection rejected."
        );
    }

    #[test]
    fn test_admin_messages() {
        let key = IdentityKey::parse("abc").unwrap();
        assert_eq!(
            AuditEvent::granted(&key, "admin-1").message(),
            "admin-1 whitelisted abc."
        );
        assert_eq!(
            AuditEvent::revoked(&key, "admin-1").message(),
            "admin-1 removed abc from the whitelist."
        );
    }

    #[test]
    fn test_event_timestamped() {
        let event = AuditEvent::connected("abc", "");
        assert!(event.timestamp > 0);
        assert_eq!(event.message(), "abc connected.");
    }
}
