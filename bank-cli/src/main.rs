//! Bank CLI - a minimal bank in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{account, auth, history, logs, status, transfer};

/// Bank - accounts and transfers in your terminal
#[derive(Parser)]
#[command(name = "bank", version, about, long_about = None)]
struct Cli {
    /// Session token from `bank login`
    #[arg(long, env = "BANK_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user and start a session
    Register {
        username: String,
        /// Password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start a session
    Login {
        username: String,
        /// Password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// End the current session
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show your account, opening it on first use
    Account {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Send money to another account
    Transfer {
        /// Destination account number
        to: String,
        /// Amount, e.g. 25.50
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List your transactions, newest first
    History {
        /// Show at most this many
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show bank-wide totals
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

/// Diagnostics go to stderr, filtered by `BANK_LOG` (default `warn`)
fn init_tracing() {
    let filter = EnvFilter::try_from_env("BANK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let token = cli.token.as_deref();
    match cli.command {
        Commands::Register { username, password, email, json } => {
            auth::run_register(&username, password, email, json)
        }
        Commands::Login { username, password, json } => auth::run_login(&username, password, json),
        Commands::Logout { json } => auth::run_logout(token, json),
        Commands::Account { json } => account::run(token, json),
        Commands::Transfer { to, amount, json } => transfer::run(token, &to, &amount, json),
        Commands::History { limit, json } => history::run(token, limit, json),
        Commands::Status { json } => status::run(json),
        Commands::Logs { command } => logs::run(command),
    }
}
