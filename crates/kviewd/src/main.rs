//! kviewd: the kview daemon.
//!
//! Single binary that assembles every kview subsystem:
//! - Retention store (SQLite)
//! - Health collector
//! - Query API
//! - Control-plane proxy
//!
//! # Usage
//!
//! ```text
//! kviewd serve --port 8080 --prefix /proxy/v1/
//! kviewd migrate --db-path /data/k8s.db
//! ```

mod config;
mod serve;
mod signal;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{DEFAULT_DB_PATH, ServeArgs, ServeConfig};

#[derive(Parser)]
#[command(name = "kviewd", about = "kview cluster health daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect health samples and serve the query API and proxy.
    Serve(ServeArgs),

    /// Create the schema and seed configuration defaults, then exit.
    Migrate {
        /// SQLite database file.
        #[arg(long, env = "KVIEW_DB_PATH", default_value = DEFAULT_DB_PATH)]
        db_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,kviewd=debug,kview=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve::serve(ServeConfig::try_from(args)?).await,
        Command::Migrate { db_path } => serve::migrate(&db_path),
    }
}
