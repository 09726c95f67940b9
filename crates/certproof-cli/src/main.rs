//! # certproof CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use clap::Parser;

use certproof_protocol::ProtocolConfig;

/// certproof: selective-disclosure test-certification credentials.
///
/// Runs the issue/present/verify walkthrough and checks persisted
/// accumulator state.
#[derive(Parser, Debug)]
#[command(name = "certproof", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Issue, store, present, verify, and revoke one credential.
    Demo(certproof_cli::demo::DemoArgs),
    /// Persisted accumulator operations.
    Snapshot(certproof_cli::snapshot::SnapshotArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = ProtocolConfig::from_env()?;

    match cli.command {
        Commands::Demo(args) => certproof_cli::demo::run(args, config).await,
        Commands::Snapshot(args) => certproof_cli::snapshot::run(args).await,
    }
}
