//! Background worker for the storefront's asynchronous tasks.
//!
//! # Usage
//!
//! ```bash
//! # Run the executor, trigger worker and daily summary schedule until Ctrl-C
//! tasksmith-worker run
//!
//! # Same, with demo users created through the write path
//! tasksmith-worker run --demo-users 3
//!
//! # Bulk-create users, profiles and orders first (no triggers fire)
//! tasksmith-worker run --seed-users 10 --seed-orders 5
//!
//! # Send the daily summary once and exit
//! tasksmith-worker digest --users 3
//! ```
//!
//! Configuration is read from `TASKSMITH_*` environment variables; a `.env`
//! file in the working directory is loaded first.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use tasksmith_infra::TaskConfig;
use tasksmith_observability::LogFormat;

mod commands;

#[derive(Parser)]
#[command(name = "tasksmith-worker")]
#[command(author, version, about = "Background task worker")]
struct Cli {
    /// Log output format (`json` or `pretty`)
    #[arg(long, global = true, env = "TASKSMITH_LOG_FORMAT", default_value = "json")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run workers until interrupted
    Run {
        /// Create this many users (with an order and a profile each) on startup
        #[arg(long, default_value_t = 0)]
        demo_users: usize,

        /// Bulk-create this many users with profiles on startup, bypassing triggers
        #[arg(long, default_value_t = 0)]
        seed_users: usize,

        /// Orders per bulk-created user
        #[arg(long, default_value_t = 5)]
        seed_orders: usize,

        /// Enqueue a daily summary immediately instead of after the first interval
        #[arg(long)]
        digest_now: bool,
    },
    /// Send the daily summary once
    Digest {
        /// Seed this many users first
        #[arg(short, long, default_value_t = 0)]
        users: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    tasksmith_observability::init_with(cli.log_format);

    let config = TaskConfig::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Run {
            demo_users,
            seed_users,
            seed_orders,
            digest_now,
        } => {
            let startup = commands::run::Startup {
                demo_users,
                seed_users,
                seed_orders,
                digest_now,
            };
            commands::run::run(config, startup).await
        }
        Commands::Digest { users } => commands::digest::run(config, users),
    }
}
