//! Caravel CLI.
//!
//! Installs Kubernetes clusters from a declarative plan file by driving
//! ansible-playbook and relaying its progress output.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use caravel_cli::commands::{ApplyCommand, PlanCommand};

/// Caravel - plan-driven Kubernetes cluster installer.
#[derive(Parser)]
#[command(name = "caravel", version, about = "Plan-driven Kubernetes cluster installer")]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a starter installation plan.
    Plan(PlanCommand),

    /// Install the cluster described by a plan.
    Apply(ApplyCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("info,ansible=debug,caravel_cli=debug")
    } else {
        EnvFilter::new("warn,ansible=info,caravel_cli=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Plan(cmd) => cmd.run(),
        Commands::Apply(cmd) => cmd.run(),
    }
}
