mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::state::StateSubcommand;
use std::path::PathBuf;

// Exit codes: the three outcome classes surfaced to callers.
pub(crate) const EXIT_OK: i32 = 0;
pub(crate) const EXIT_ERROR: i32 = 1;
pub(crate) const EXIT_TIMEOUT: i32 = 2;

#[derive(Parser)]
#[command(
    name = "relay",
    about = "Send messages to terminal agent endpoints and wait for their replies",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: $AGENT_RELAY_CONFIG, else ~/.agent-relay/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message to one endpoint
    Send {
        /// Endpoint name from the config file
        endpoint: String,

        #[arg(required = true)]
        message: Vec<String>,

        /// Wait for the endpoint's reply instead of fire-and-forget
        #[arg(long)]
        wait: bool,

        /// Per-request timeout override (seconds)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Skip preamble injection for this send
        #[arg(long)]
        no_preamble: bool,
    },

    /// Send a message to every endpoint except your own and wait for all replies
    Broadcast {
        #[arg(required = true)]
        message: Vec<String>,

        /// Per-endpoint timeout override (seconds)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Skip preamble injection for this broadcast
        #[arg(long)]
        no_preamble: bool,
    },

    /// List configured endpoints
    Endpoints,

    /// Inspect and prune in-flight request state
    State {
        #[command(subcommand)]
        subcommand: StateSubcommand,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Send {
            endpoint,
            message,
            wait,
            timeout_secs,
            no_preamble,
        } => cmd::send::run(
            config_path,
            &endpoint,
            &message.join(" "),
            wait,
            timeout_secs,
            no_preamble,
            cli.json,
        ),
        Commands::Broadcast {
            message,
            timeout_secs,
            no_preamble,
        } => cmd::broadcast::run(
            config_path,
            &message.join(" "),
            timeout_secs,
            no_preamble,
            cli.json,
        ),
        Commands::Endpoints => cmd::endpoints::run(config_path, cli.json),
        Commands::State { subcommand } => cmd::state::run(subcommand, cli.json),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            // Print the full error chain (anyhow's alternate Display)
            eprintln!("error: {e:#}");
            std::process::exit(EXIT_ERROR);
        }
    }
}
