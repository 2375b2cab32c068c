//! myPlant backend CLI, the main entry point.
//!
//! Commands:
//! - `serve`    Start the HTTP gateway
//! - `ask`      Ask the farm assistant one question
//! - `doctor`   Diagnose configuration health
//! - `onboard`  Write a default config file

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "myplant",
    about = "myPlant backend: data keys, event pushes, and the farm assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask the farm assistant a single question
    Ask {
        /// The question
        prompt: String,

        /// Restrict to one device
        #[arg(short, long)]
        device: Option<String>,

        /// latest, today, week, or month
        #[arg(short, long)]
        range: Option<String>,
    },

    /// Diagnose configuration health
    Doctor,

    /// Write a default configuration file
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Ask { prompt, device, range } => commands::ask::run(prompt, device, range).await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
