//! AutoPilot - per-user automated portfolio pilots
//!
//! # WARNING
//! - Prices and returns are simulated unless a live oracle is wired in.
//! - Nothing here is investment advice.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use autopilot_engine::cli::commands;
use autopilot_engine::config::Config;

/// AutoPilot capital engine
#[derive(Parser)]
#[command(name = "autopilot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the engine and its scheduler
    Run {
        /// Create this many demo pilots on startup
        #[arg(long, default_value = "0")]
        demo_pilots: usize,
    },

    /// Run one pilot through a number of cycles and print the outcome
    Simulate {
        /// Initial deposit
        #[arg(long, default_value = "10000")]
        deposit: f64,

        /// Risk DNA: ultra_safe, careful, balanced, growth, aggressive, yolo
        #[arg(long, default_value = "balanced")]
        risk: String,

        /// Trading cycles to run
        #[arg(long, default_value = "30")]
        cycles: usize,
    },

    /// List the absorbed strategy catalog
    Strategies,

    /// Show persisted pilots and totals
    Status,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("autopilot_engine=info".parse()?);
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    }

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Run { demo_pilots } => commands::run(&config, demo_pilots).await,
        Commands::Simulate {
            deposit,
            risk,
            cycles,
        } => commands::simulate(&config, deposit, &risk, cycles).await,
        Commands::Strategies => commands::strategies(&config).await,
        Commands::Status => commands::status(&config).await,
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
