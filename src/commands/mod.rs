//! Admin Command Handling
//!
//! Commands: /grant, /revoke, /describe, /help
//!
//! Every command is admin-only. Arguments come from the host as raw tokens
//! and go through `parse_command`, which fails with `MissingArgument`
//! instead of operating on an empty key.

use crate::gate::{GateError, GateResult, WhitelistGate};
use crate::whitelist::{Identity, IdentityKey};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

pub const PLUGIN_NAME: &str = "Whitelist";
pub const PLUGIN_DESCRIPTION: &str = "Only lets whitelisted identities join this server.";
pub const PLUGIN_AUTHOR: &str = "Gatehouse Project";
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parsed admin command
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    /// Add an identity key to the whitelist
    Grant { identity_key: IdentityKey },

    /// Remove an identity key from the whitelist
    Revoke { identity_key: IdentityKey },

    /// Plugin metadata and persisted whitelist size
    Describe,

    /// Show help
    Help,
}

/// Command metadata used for host registration and help text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub description: &'static str,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "grant",
        aliases: &["add", "whitelist"],
        usage: "/grant <identity_key>",
        description: "Whitelist an identity key",
    },
    CommandSpec {
        name: "revoke",
        aliases: &["remove", "unwhitelist"],
        usage: "/revoke <identity_key>",
        description: "Remove an identity key from the whitelist",
    },
    CommandSpec {
        name: "describe",
        aliases: &["info"],
        usage: "/describe",
        description: "Show plugin info and whitelist size",
    },
    CommandSpec {
        name: "help",
        aliases: &[],
        usage: "/help",
        description: "Show this help message",
    },
];

fn lookup(name: &str) -> Option<&'static CommandSpec> {
    let name = name.strip_prefix('/').unwrap_or(name);
    COMMANDS.iter().find(|entry| {
        entry.name.eq_ignore_ascii_case(name)
            || entry.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    })
}

/// Parse a command from its name and raw argument tokens.
///
/// Extra tokens after the identity key are ignored.
pub fn parse_command<S: AsRef<str>>(name: &str, args: &[S]) -> GateResult<AdminCommand> {
    let entry = lookup(name).ok_or_else(|| GateError::UnknownCommand(name.to_string()))?;

    let identity_key = || -> GateResult<IdentityKey> {
        let raw = args.first().map(|a| a.as_ref()).unwrap_or("");
        IdentityKey::parse(raw).map_err(|e| GateError::from_key_error("identity_key", e))
    };

    match entry.name {
        "grant" => Ok(AdminCommand::Grant {
            identity_key: identity_key()?,
        }),
        "revoke" => Ok(AdminCommand::Revoke {
            identity_key: identity_key()?,
        }),
        "describe" => Ok(AdminCommand::Describe),
        _ => Ok(AdminCommand::Help),
    }
}

/// Parse a full command line such as `/grant 0x7e71738cb63c735e`.
pub fn parse_line(line: &str) -> GateResult<AdminCommand> {
    let mut tokens = line.split_whitespace();
    let name = tokens
        .next()
        .ok_or_else(|| GateError::UnknownCommand(String::new()))?;
    let args: Vec<&str> = tokens.collect();
    parse_command(name, &args)
}

/// Help listing for every command.
pub fn help_text() -> String {
    let mut out = format!("{} commands:\n", PLUGIN_NAME);
    for entry in COMMANDS {
        out.push_str(&format!("  {} - {}\n", entry.usage, entry.description));
    }
    out.trim_end().to_string()
}

/// Host primitive for replying to the issuer of a command.
pub trait Responder: Send + Sync {
    fn reply(&self, text: &str);
}

/// Output of `describe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub author: &'static str,
    pub version: &'static str,
    /// Whitelist size as persisted in the store.
    pub whitelisted: u64,
    pub commands: Vec<&'static str>,
}

impl fmt::Display for PluginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} v{} by {}", self.name, self.version, self.author)?;
        writeln!(f, "{}", self.description)?;
        writeln!(f, "Whitelisted identities: {}", self.whitelisted)?;
        write!(f, "Commands: {}", self.commands.join(", "))
    }
}

/// Admin command handlers bound to one gate.
#[derive(Clone)]
pub struct AdminCommands {
    gate: Arc<WhitelistGate>,
}

impl AdminCommands {
    pub fn new(gate: Arc<WhitelistGate>) -> Self {
        Self { gate }
    }

    /// Commands the host should register, with their metadata.
    pub fn registrations(&self) -> &'static [CommandSpec] {
        COMMANDS
    }

    /// Parse, authorize and run one command, replying to the issuer.
    ///
    /// The reply text is also returned. Failures are reported to the issuer
    /// and returned; none of them are fatal.
    pub async fn dispatch<S: AsRef<str>>(
        &self,
        issuer: &Identity,
        name: &str,
        args: &[S],
        responder: &dyn Responder,
    ) -> GateResult<String> {
        let result = match parse_command(name, args) {
            Ok(command) => self.execute(issuer, command).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(text) => {
                responder.reply(&text);
                Ok(text)
            }
            Err(e) => {
                warn!(
                    issuer = %issuer.identity_key,
                    command = name,
                    error = %e,
                    "admin command failed"
                );
                responder.reply(&error_reply(name, &e));
                Err(e)
            }
        }
    }

    /// Run an already-parsed command.
    pub async fn execute(&self, issuer: &Identity, command: AdminCommand) -> GateResult<String> {
        if !issuer.is_privileged {
            return Err(GateError::Unauthorized);
        }
        debug!(issuer = %issuer.identity_key, ?command, "admin command");

        match command {
            AdminCommand::Grant { identity_key } => self.grant(issuer, identity_key).await,
            AdminCommand::Revoke { identity_key } => self.revoke(issuer, identity_key).await,
            AdminCommand::Describe => Ok(self.describe().await?.to_string()),
            AdminCommand::Help => Ok(help_text()),
        }
    }

    async fn grant(&self, issuer: &Identity, identity_key: IdentityKey) -> GateResult<String> {
        let record = self.gate.grant(identity_key, issuer.audit_label()).await?;
        Ok(format!("{} has been whitelisted.", record.identity_key))
    }

    async fn revoke(&self, issuer: &Identity, identity_key: IdentityKey) -> GateResult<String> {
        let record = self
            .gate
            .revoke(identity_key, issuer.audit_label())
            .await?;
        Ok(format!(
            "{} has been removed from the whitelist.",
            record.identity_key
        ))
    }

    pub async fn describe(&self) -> GateResult<PluginInfo> {
        Ok(PluginInfo {
            name: PLUGIN_NAME,
            description: PLUGIN_DESCRIPTION,
            author: PLUGIN_AUTHOR,
            version: PLUGIN_VERSION,
            whitelisted: self.gate.persisted_count().await?,
            commands: COMMANDS.iter().map(|spec| spec.usage).collect(),
        })
    }
}

fn error_reply(name: &str, err: &GateError) -> String {
    match err {
        GateError::MissingArgument(_) | GateError::InvalidArgument { .. } => {
            let usage = lookup(name).map(|spec| spec.usage).unwrap_or("/help");
            format!("Error: {}\nUsage: {}", err, usage)
        }
        GateError::UnknownCommand(_) => format!("Error: {}\n{}", err, help_text()),
        GateError::StoreUnavailable(_) | GateError::CacheInconsistent(_) => {
            "Error: the whitelist could not be updated, try again later.".to_string()
        }
        _ => format!("Error: {}", err),
    }
}
