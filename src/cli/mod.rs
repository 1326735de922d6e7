//! CLI module - command-line interface for waypoint.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as a background daemon: web API, progress provider, verifier
    /// loop, and the anime-service hub connection, all together.
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Run only the web API, with no background pollers.
    Serve,

    /// Run one verifier pass and exit, without starting the daemon.
    Check,

    /// Trigger a one-off library-sync backfill and exit (spec §4.K).
    #[command(alias = "sync-library")]
    SyncLibrary,

    /// Create a default config.toml if one doesn't already exist.
    #[command(alias = "--init")]
    Init,
}
