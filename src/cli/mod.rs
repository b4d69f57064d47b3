use clap::{Parser, Subcommand};

pub mod check_config;
pub mod config;
pub mod run;
pub mod version;

#[derive(Parser)]
#[command(name = "gatehouse")]
#[command(author = "Gatehouse Project")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Whitelist gate for game and chat servers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the gate behind an interactive console host
    Run {
        /// Path to config file (default: ~/.local/share/gatehouse/config.toml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Load and validate the configuration file
    CheckConfig {
        /// Path to config file (default: ~/.local/share/gatehouse/config.toml)
        #[arg(long)]
        config: Option<String>,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run { config } => run::execute(config).await,
        Commands::CheckConfig { config } => check_config::execute(config),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
