//! planectl - operator CLI for the Host control plane

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use planectl_api::{ApiClient, ClientConfig};
use planectl_api::config::{DEFAULT_HOST, DEFAULT_TIMEOUT_SECS, ENV_HOST, ENV_TOKEN};

mod commands;
mod display;
mod error;
mod exit_codes;

use commands::Context;
use commands::lifecycle::LifecycleCommands;
use commands::marketplace::MarketplaceCommands;
use commands::policy::PolicyCommands;
use commands::remediation::RemediationCommands;
use commands::trust::TrustCommands;
use error::Result;

#[derive(Parser)]
#[command(name = "planectl")]
#[command(version)]
#[command(about = "Operator CLI for the Host control plane", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Host base URL
    #[arg(long, global = true, env = ENV_HOST, default_value = DEFAULT_HOST)]
    host: String,

    /// Bearer token for the Host API
    #[arg(long, global = true, env = ENV_TOKEN, hide_env_values = true)]
    token: Option<String>,

    /// Request timeout in seconds (streams stay open regardless)
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Render output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Runtime policy insights
    Policy {
        #[command(subcommand)]
        command: PolicyCommands,
    },

    /// Trust registry control plane
    Trust {
        #[command(subcommand)]
        command: TrustCommands,
    },

    /// Lifecycle console snapshots and streaming automation context
    Lifecycle {
        #[command(subcommand)]
        command: LifecycleCommands,
    },

    /// Remediation control plane operations
    Remediation {
        #[command(subcommand)]
        command: RemediationCommands,
    },

    /// Marketplace operations
    Marketplace {
        #[command(subcommand)]
        command: MarketplaceCommands,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = ClientConfig::new(&cli.host)
        .with_token(cli.token.clone())
        .with_timeout_secs(cli.timeout);
    let client = match ApiClient::new(config) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(exit_codes::ERROR);
        }
    };
    let ctx = Context {
        client,
        json: cli.json,
    };

    let code = match dispatch(&ctx, cli.command).await {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            if cli.json {
                if let Some(payload) = err.payload() {
                    eprintln!("{payload}");
                }
            }
            err.exit_code()
        }
    };
    std::process::exit(code);
}

async fn dispatch(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Policy { command } => commands::policy::run(ctx, command).await,
        Commands::Trust { command } => commands::trust::run(ctx, command).await,
        Commands::Lifecycle { command } => commands::lifecycle::run(ctx, command).await,
        Commands::Remediation { command } => commands::remediation::run(ctx, command).await,
        Commands::Marketplace { command } => commands::marketplace::run(ctx, command).await,
    }
}
