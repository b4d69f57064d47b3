use super::config::{default_config_path, GatehouseConfig};
use std::path::PathBuf;

/// Load and validate the configuration, then print what `run` would use.
pub fn execute(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    let config = GatehouseConfig::load(&config_path)?;
    config.validate()?;

    println!("✅ Config OK: {}", config_path.display());
    for line in summary(&config) {
        println!("  {}", line);
    }
    Ok(())
}

fn summary(config: &GatehouseConfig) -> Vec<String> {
    let store = match &config.store.path {
        Some(path) => format!("Store: {}", path.display()),
        None => "Store: in-memory (not persisted)".to_string(),
    };
    let audit = match &config.audit.webhook_url {
        Some(_) => format!("Audit: webhook (timeout {}s)", config.audit.timeout_secs),
        None => "Audit: log only".to_string(),
    };
    vec![
        format!("Realm: {}", config.gate.realm_id),
        store,
        audit,
        format!("Log level: {}", config.logging.level),
    ]
}
