use super::config::{default_config_path, default_store_path, GatehouseConfig};
use gatehouse::audit::{AuditNotifier, AuditSink, LogSink, WebhookSink};
use gatehouse::store::{MembershipStore, MemoryMembershipStore, SqliteMembershipStore};
use gatehouse::{
    AdminCommands, ClientChannel, ClientNotice, HookOutcome, HookRegistry, Identity, RealmId,
    Responder, WhitelistGate,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Host lifecycle point the gate intercepts.
const LOGIN_POINT: &str = "zone_login";

/// Identity the console operator issues admin commands as.
const CONSOLE_OPERATOR_KEY: &str = "console";

/// Run the gate behind an interactive console host
///
/// Stands in for a game or chat server: each stdin line is a login attempt,
/// an admin command, or `quit`.
///
/// ## Configuration Loading
///
/// 1. `--config` flag if provided
/// 2. Default config at `~/.local/share/gatehouse/config.toml`
///
/// If the config file doesn't exist, a default one is generated.
///
/// ## Console Input
///
/// - `login <identity_key> [display name] [--admin]`
/// - `/<command> [args]` runs an admin command as the console operator
/// - `quit` or `exit`
pub async fn execute(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    let config = if config_path.exists() {
        GatehouseConfig::load(&config_path)?
    } else {
        println!("📝 No config file found. Creating default configuration...");
        GatehouseConfig::create_default(&config_path, &default_store_path())?;
        println!("   Created: {}", config_path.display());
        GatehouseConfig::load(&config_path)?
    };
    config.validate()?;

    init_logging(&config.logging.level);
    info!(config = %config_path.display(), "starting gatehouse");

    println!("🚪 Gatehouse guarding realm {}", config.gate.realm_id);
    println!("Type `login <key> [name] [--admin]`, `/help` or `quit`.");

    let console = Arc::new(Console::stdout());
    serve(&config, BufReader::new(tokio::io::stdin()), console).await
}

/// Install the `tracing` subscriber. `RUST_LOG` overrides `level`.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Wire store, audit worker, gate, hooks and commands, then drive them from
/// `input` until EOF or `quit`.
pub async fn serve<R>(
    config: &GatehouseConfig,
    input: R,
    console: Arc<Console>,
) -> Result<(), Box<dyn std::error::Error>>
where
    R: AsyncBufRead + Unpin,
{
    let (store, sqlite): (Arc<dyn MembershipStore>, Option<SqliteMembershipStore>) =
        match &config.store.path {
            Some(path) => {
                let sqlite = SqliteMembershipStore::open(path).await?;
                info!(path = %path.display(), "opened whitelist database");
                (Arc::new(sqlite.clone()), Some(sqlite))
            }
            None => {
                warn!("no [store] path configured, whitelist changes will not survive a restart");
                (Arc::new(MemoryMembershipStore::new()), None)
            }
        };

    let sink: Arc<dyn AuditSink> = match config.webhook_url()? {
        Some(url) => Arc::new(WebhookSink::new(url, config.audit_timeout())?),
        None => Arc::new(LogSink),
    };
    let (notifier, _worker) =
        AuditNotifier::spawn_with_capacity(sink, config.audit.queue_capacity);

    let realm = RealmId::new(config.gate.realm_id.trim());
    let gate = Arc::new(WhitelistGate::hydrate(realm, store, notifier.clone()).await?);

    let mut login = HookRegistry::new(LOGIN_POINT);
    gate.install(&mut login, console.clone());
    let commands = AdminCommands::new(gate.clone());
    let operator = Identity::privileged(CONSOLE_OPERATOR_KEY, "Console");

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match ConsoleInput::parse(&line) {
            ConsoleInput::Empty => {}
            ConsoleInput::Quit => break,
            ConsoleInput::Login(identity) => {
                let outcome = login.run(&identity, |identity| {
                    console.say(format!("{} joined the session.", identity.display_name));
                });
                if let HookOutcome::Suppressed { by } = outcome {
                    debug!(identity_key = %identity.identity_key, hook = %by, "login suppressed");
                }
            }
            ConsoleInput::Command { name, args } => {
                // Failures are already replied to the console.
                let _ = commands
                    .dispatch(&operator, &name, args.as_slice(), console.as_ref())
                    .await;
            }
            ConsoleInput::Unrecognized(text) => {
                console.say(format!(
                    "Unrecognized input '{}'. Try `login <key>`, `/help` or `quit`.",
                    text
                ));
            }
        }
    }

    notifier.flush().await;
    if let Some(sqlite) = sqlite {
        sqlite.close().await;
    }
    info!("gatehouse stopped");
    Ok(())
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Empty,
    Quit,
    Login(Identity),
    Command { name: String, args: Vec<String> },
    Unrecognized(String),
}

impl ConsoleInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ConsoleInput::Empty;
        }
        if let Some(rest) = line.strip_prefix('/') {
            let mut tokens = rest.split_whitespace().map(str::to_string);
            let name = tokens.next().unwrap_or_default();
            return ConsoleInput::Command {
                name,
                args: tokens.collect(),
            };
        }

        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("quit") | Some("exit") => ConsoleInput::Quit,
            Some("login") => {
                // Missing key is kept as "" so the gate can reject it.
                let key = tokens.next().unwrap_or_default();
                let mut privileged = false;
                let mut name_parts = Vec::new();
                for token in tokens {
                    if token == "--admin" {
                        privileged = true;
                    } else {
                        name_parts.push(token);
                    }
                }
                let display_name = if name_parts.is_empty() {
                    key.to_string()
                } else {
                    name_parts.join(" ")
                };
                let identity = if privileged {
                    Identity::privileged(key, display_name)
                } else {
                    Identity::new(key, display_name)
                };
                ConsoleInput::Login(identity)
            }
            _ => ConsoleInput::Unrecognized(line.to_string()),
        }
    }
}

/// Console-backed host primitives: client notices and command replies.
pub struct Console {
    echo: bool,
    transcript: Mutex<Vec<String>>,
}

impl Console {
    /// Print everything to stdout.
    pub fn stdout() -> Self {
        Self {
            echo: true,
            transcript: Mutex::new(Vec::new()),
        }
    }

    /// Keep output in memory only.
    #[cfg(test)]
    pub fn captured() -> Self {
        Self {
            echo: false,
            transcript: Mutex::new(Vec::new()),
        }
    }

    #[cfg(test)]
    pub fn transcript(&self) -> Vec<String> {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn say(&self, line: String) {
        if self.echo {
            println!("{}", line);
        } else {
            self.transcript
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(line);
        }
    }
}

impl ClientChannel for Console {
    fn send_notice(&self, identity: &Identity, notice: ClientNotice) {
        if notice.clear_output {
            self.say(format!("[to {}] (console cleared)", identity.identity_key));
        }
        self.say(format!("[to {}] {}", identity.identity_key, notice.text));
    }
}

impl Responder for Console {
    fn reply(&self, text: &str) {
        for line in text.lines() {
            self.say(line.to_string());
        }
    }
}
