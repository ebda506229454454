//! tokengate daemon: entry point for the verification API and role sync.

mod commands;
mod config;
mod error;
mod shutdown;

use std::path::PathBuf;

use clap::Parser;
use tokengate_store::{AssetKind, Condition};
use tokengate_types::RoleId;

use crate::config::{ConfigOverrides, GateConfig};

#[derive(Parser)]
#[command(name = "tokengate", about = "Token-gated community roles from verified wallets")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base; CLI
    /// flags and env vars override them.
    #[arg(long, env = "TOKENGATE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Serve the verification HTTP API. Requires `TOKENGATE_API_TOKEN`.
    Serve,

    /// Reconcile member roles with wallet holdings.
    Sync {
        /// Repeat passes every N seconds until signalled (0 runs once).
        #[arg(long, env = "TOKENGATE_SYNC_INTERVAL_SECS")]
        interval_secs: Option<u64>,
    },

    /// Administer entitlement rules.
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
}

#[derive(clap::Subcommand)]
enum RulesAction {
    /// List every rule.
    List,

    /// Add a rule.
    Add {
        /// Role granted to qualifying holders.
        #[arg(long)]
        role_id: RoleId,

        /// Role name shown in logs.
        #[arg(long)]
        role_name: Option<String>,

        /// Mint address (tokens) or collection address (NFTs).
        #[arg(long)]
        asset_address: String,

        /// TOKEN or NFT_COLLECTION.
        #[arg(long)]
        asset_kind: AssetKind,

        /// GREATER_OR_EQUAL_BALANCE or HAS_AT_LEAST_N (legacy names accepted).
        #[arg(long)]
        condition: Condition,

        /// Whole tokens, or number of items.
        #[arg(long)]
        required_value: f64,
    },

    /// Remove a rule by id.
    Remove { id: u64 },
}

fn load_config(path: Option<&PathBuf>, overrides: ConfigOverrides) -> anyhow::Result<GateConfig> {
    let base = match path {
        Some(path) => GateConfig::from_toml_file(path)?,
        None => GateConfig::default(),
    };
    Ok(overrides.apply(base))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_ref(), cli.overrides)?;
    tokengate_utils::init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "loaded config");
    }

    match cli.command {
        Command::Serve => commands::serve(&config).await?,
        Command::Sync { interval_secs } => {
            if let Some(secs) = interval_secs {
                config.sync_interval_secs = secs;
            }
            commands::sync(&config).await?
        }
        Command::Rules { action } => match action {
            RulesAction::List => commands::list_rules(&config)?,
            RulesAction::Add {
                role_id,
                role_name,
                asset_address,
                asset_kind,
                condition,
                required_value,
            } => commands::add_rule(
                &config,
                tokengate_store::EntitlementRule {
                    id: 0,
                    role_id,
                    role_name,
                    asset_address,
                    asset_kind,
                    condition,
                    required_value,
                },
            )?,
            RulesAction::Remove { id } => commands::remove_rule(&config, id)?,
        },
    }
    Ok(())
}
