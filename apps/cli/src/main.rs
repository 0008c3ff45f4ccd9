//! # habitbuddy
//!
//! Command-line client for HabitBuddy:
//! - `habitbuddy login/register/logout/whoami` - manage the stored session
//! - `habitbuddy matches` - show matched and unmatched goals with names
//! - `habitbuddy goals` - list the goal catalog
//! - `habitbuddy enroll <GOAL_ID>` - enroll in a goal

mod commands;
mod config;
mod main_lib;
mod session_store;

use clap::{Parser, Subcommand};
use config::Config;
use habitbuddy_core::matches::JoinPolicy;
use main_lib::{build_state, init_tracing};

/// HabitBuddy CLI - find accountability partners for your goals.
#[derive(Parser)]
#[command(name = "habitbuddy", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and store the session.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Print the signed-in user id.
    Whoami,
    /// Show your matched and unmatched goals.
    Matches {
        /// Fail if any name lookup fails instead of marking it unavailable.
        #[arg(long)]
        strict: bool,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// List the goal catalog.
    Goals {
        #[arg(long)]
        json: bool,
    },
    /// Enroll in a goal from the catalog.
    Enroll {
        goal_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing();

    let policy = match &cli.command {
        Commands::Matches { strict: true, .. } => Some(JoinPolicy::Strict),
        _ => None,
    };
    let state = build_state(&config, policy)?;

    match cli.command {
        Commands::Login { email, password } => commands::login(&state, email, password).await,
        Commands::Register {
            name,
            email,
            password,
        } => commands::register(&state, name, email, password).await,
        Commands::Logout => commands::logout(&state),
        Commands::Whoami => commands::whoami(&state),
        Commands::Matches { json, .. } => commands::matches(&state, json).await,
        Commands::Goals { json } => commands::goals(&state, json).await,
        Commands::Enroll { goal_id } => commands::enroll(&state, &goal_id).await,
    }
}
