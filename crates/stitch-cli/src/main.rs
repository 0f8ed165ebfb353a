// crates/stitch-cli/src/main.rs
//
// CLI entrypoint for the Stitch developer tools.
//
// Talks to backend services directly over the gateway's RPC protocol,
// bypassing the gateway, and generates keypairs for payload encryption.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::keygen::KeygenCmd;
use commands::query::QueryCmd;

/// Stitch CLI: developer tools for the Stitch GraphQL gateway.
#[derive(Parser, Debug)]
#[command(
    name = "stitch",
    version = "0.1.0",
    about = "Stitch CLI: query backends and manage encryption keys"
)]
struct Cli {
    /// Backend RPC endpoint (host:port or URL).
    #[arg(long, global = true, default_value = "http://localhost:50051")]
    endpoint: String,

    /// Per-call deadline in milliseconds.
    #[arg(long, global = true, default_value = "10000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a backend's schema document.
    Schema,

    /// Send one GraphQL operation to a backend.
    Query(QueryCmd),

    /// Generate an RSA keypair for payload encryption.
    Keygen(KeygenCmd),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Schema => commands::schema::run(&cli.endpoint, cli.timeout_ms).await?,
        Commands::Query(cmd) => commands::query::run(&cli.endpoint, cli.timeout_ms, cmd).await?,
        Commands::Keygen(cmd) => commands::keygen::run(cmd)?,
    }

    Ok(())
}
