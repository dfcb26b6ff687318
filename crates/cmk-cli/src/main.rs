use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cmk::{MachineConnector, MintController, PublicKey};
use cmk_fake_machine::FakeMachine;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::{Backend, Settings};

mod config;
mod sub_commands;

/// Candy machine mint client
#[derive(Parser)]
#[command(name = "cmk-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Logging level
    #[arg(short, long, default_value = "error")]
    log_level: Level,
    /// Wallet public key, overrides the configured wallet
    #[arg(short, long, env = "CMK_IDENTITY")]
    identity: Option<PublicKey>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh and print balance, supply and activation
    Status,
    /// Run one mint attempt
    Mint(sub_commands::mint::MintSubCommand),
    /// Time left until minting opens
    Countdown,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Cli = Cli::parse();
    let default_filter = args.log_level;

    let env_filter = EnvFilter::new(default_filter.to_string());

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings = Settings::new(args.config)?;
    tracing::debug!("Loaded settings: {:?}", settings);

    let connector: Arc<dyn MachineConnector + Send + Sync> = match settings.backend {
        Backend::Fake => Arc::new(FakeMachine::new(settings.fake_machine.clone())),
    };

    let identity = args.identity.or(settings.wallet.identity);
    let controller = MintController::new(settings.mint, connector, identity);

    let res = match &args.command {
        Commands::Status => sub_commands::status::status(&controller).await,
        Commands::Mint(sub_command_args) => {
            sub_commands::mint::mint(&controller, sub_command_args).await
        }
        Commands::Countdown => sub_commands::countdown::countdown(&controller).await,
    };

    controller.shutdown();

    res
}
