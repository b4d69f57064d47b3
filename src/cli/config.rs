//! Gatehouse configuration file handling
//!
//! Provides default configuration generation, loading and validation for the
//! operator CLI. Configuration files are TOML format and live in the
//! platform data directory unless `--config` points elsewhere.
//!
//! Only deployment settings live here (realm, database, audit endpoint,
//! logging). Whitelist membership itself is never configured by file; it is
//! managed at runtime through the admin commands.

use gatehouse::audit::DEFAULT_QUEUE_CAPACITY;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default audit webhook request timeout
const DEFAULT_AUDIT_TIMEOUT_SECS: u64 = 10;

/// Gatehouse operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatehouseConfig {
    /// Realm this gate guards
    pub gate: GateConfig,

    /// Whitelist database
    #[serde(default)]
    pub store: StoreConfig,

    /// Audit notification endpoint
    #[serde(default)]
    pub audit: AuditConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Identifier of the guarded realm. Whitelist rows are scoped by it.
    pub realm_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// SQLite database path. Unset means a volatile in-memory store.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Chat webhook receiving audit messages. Unset means log-only.
    pub webhook_url: Option<String>,

    /// Request timeout for webhook delivery, in seconds
    #[serde(default = "default_audit_timeout_secs")]
    pub timeout_secs: u64,

    /// Audit events held while the sink is busy; further events are dropped
    #[serde(default = "default_audit_queue_capacity")]
    pub queue_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_audit_timeout_secs() -> u64 {
    DEFAULT_AUDIT_TIMEOUT_SECS
}

fn default_audit_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: DEFAULT_AUDIT_TIMEOUT_SECS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl GatehouseConfig {
    /// Create a new configuration for `realm_id` with an optional database
    #[cfg(test)]
    pub fn new(realm_id: impl Into<String>, store_path: Option<PathBuf>) -> Self {
        Self {
            gate: GateConfig {
                realm_id: realm_id.into(),
            },
            store: StoreConfig { path: store_path },
            audit: AuditConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: GatehouseConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    #[cfg(test)]
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Check the settings that serde alone cannot.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.gate.realm_id.trim().is_empty() {
            return Err("[gate] realm_id must not be empty".into());
        }
        if self.audit.timeout_secs == 0 {
            return Err("[audit] timeout_secs must be at least 1".into());
        }
        if self.audit.queue_capacity == 0 {
            return Err("[audit] queue_capacity must be at least 1".into());
        }
        self.webhook_url()?;
        Ok(())
    }

    /// Parsed audit webhook URL, if one is configured
    pub fn webhook_url(&self) -> Result<Option<Url>, Box<dyn std::error::Error>> {
        let Some(raw) = self.audit.webhook_url.as_deref() else {
            return Ok(None);
        };
        let url = Url::parse(raw.trim())
            .map_err(|e| format!("Invalid [audit] webhook_url '{}': {}", raw, e))?;
        match url.scheme() {
            "http" | "https" => Ok(Some(url)),
            other => Err(format!(
                "[audit] webhook_url must be http or https, got '{}'",
                other
            )
            .into()),
        }
    }

    pub fn audit_timeout(&self) -> Duration {
        Duration::from_secs(self.audit.timeout_secs)
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(store_path: &Path) -> String {
        format!(
            r#"# Gatehouse Configuration
#
# Whitelist membership is NOT configured here. Administrators manage it at
# runtime with /grant and /revoke; it is persisted in the database below.

[gate]
# Realm (server) identifier; whitelist rows are scoped by it
realm_id = "1"

[store]
# Path to the SQLite whitelist database
# Comment out to use a volatile in-memory store (lost on restart)
path = "{store_path}"

[audit]
# Chat webhook receiving audit messages (connections, rejections, changes)
# Leave commented to only log audit messages locally
# webhook_url = "https://discord.com/api/webhooks/..."

# Webhook request timeout in seconds
timeout_secs = {timeout}

# Audit events held while the webhook is slow; further events are dropped
queue_capacity = {queue_capacity}

[logging]
# Log level: trace, debug, info, warn, error
# RUST_LOG overrides this when set
level = "info"
"#,
            store_path = store_path.display(),
            timeout = DEFAULT_AUDIT_TIMEOUT_SECS,
            queue_capacity = DEFAULT_QUEUE_CAPACITY,
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(
        config_path: &Path,
        store_path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(store_path);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

/// Base data directory: `~/.local/share/gatehouse` on Linux
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gatehouse")
}

pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

/// Get the default whitelist database path
pub fn default_store_path() -> PathBuf {
    default_data_dir().join("whitelist.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_config_defaults() {
        let config = GatehouseConfig::new("7", None);

        assert_eq!(config.gate.realm_id, "7");
        assert!(config.store.path.is_none());
        assert!(config.audit.webhook_url.is_none());
        assert_eq!(config.audit.timeout_secs, 10);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let store_path = temp_dir.path().join("whitelist.db");

        let mut config = GatehouseConfig::new("3", Some(store_path.clone()));
        config.audit.webhook_url = Some("https://hooks.example.org/abc".to_string());
        config.save(&config_path).unwrap();

        let loaded = GatehouseConfig::load(&config_path).unwrap();
        assert_eq!(loaded.gate.realm_id, "3");
        assert_eq!(loaded.store.path, Some(store_path));
        assert_eq!(
            loaded.audit.webhook_url.as_deref(),
            Some("https://hooks.example.org/abc")
        );
    }

    #[test]
    fn test_create_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");
        let store_path = temp_dir.path().join("whitelist.db");

        GatehouseConfig::create_default(&config_path, &store_path).unwrap();
        assert!(config_path.exists());

        let config = GatehouseConfig::load(&config_path).unwrap();
        assert_eq!(config.gate.realm_id, "1");
        assert_eq!(config.store.path, Some(store_path));
        assert!(config.audit.webhook_url.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_generate_default_toml() {
        let toml = GatehouseConfig::generate_default_toml(Path::new("/data/gatehouse/wl.db"));

        assert!(toml.contains("path = \"/data/gatehouse/wl.db\""));
        assert!(toml.contains("realm_id = \"1\""));
        assert!(toml.contains("timeout_secs = 10"));
        assert!(toml.contains("queue_capacity = 1024"));
        // Membership is runtime state, never a config section.
        assert!(!toml.contains("[whitelist]"));
    }

    #[test]
    fn test_load_minimal_config_applies_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[gate]\nrealm_id = \"9\"\n").unwrap();

        let config = GatehouseConfig::load(&config_path).unwrap();
        assert!(config.store.path.is_none());
        assert_eq!(config.audit.timeout_secs, 10);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.audit_timeout(), Duration::from_secs(10));
        assert_eq!(config.audit.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_load_rejects_missing_gate_section() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[logging]\nlevel = \"debug\"\n").unwrap();

        let err = GatehouseConfig::load(&config_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_validate_rejects_empty_realm() {
        let config = GatehouseConfig::new("  ", None);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_webhook_scheme() {
        let mut config = GatehouseConfig::new("1", None);

        config.audit.webhook_url = Some("ftp://example.org/hook".to_string());
        assert!(config.validate().is_err());

        config.audit.webhook_url = Some("not a url".to_string());
        assert!(config.validate().is_err());

        config.audit.webhook_url = Some("http://127.0.0.1:8080/hook".to_string());
        let url = config.webhook_url().unwrap().unwrap();
        assert_eq!(url.host_str(), Some("127.0.0.1"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = GatehouseConfig::new("1", None);
        config.audit.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_queue_capacity() {
        let mut config = GatehouseConfig::new("1", None);
        config.audit.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_paths_share_data_dir() {
        assert_eq!(default_config_path().parent(), default_store_path().parent());
        assert!(default_store_path().ends_with("gatehouse/whitelist.db"));
    }
}
