//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Bearer token for the queue service
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow a station queue live until Ctrl+C
    Watch {
        /// Station (destination) identifier
        #[arg(short, long)]
        station: String,
    },
    /// Print a station queue
    Queue {
        #[arg(short, long)]
        station: String,
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print per-station summaries
    Summaries {
        /// Print summaries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move an entry from one queue position to another (1-based)
    Move {
        #[arg(short, long)]
        station: String,
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },
    /// Remove an entry from a station queue
    Delete {
        #[arg(short, long)]
        station: String,
        /// Entry identifier
        #[arg(short, long)]
        entry: String,
    },
    /// Enter a vehicle into a station queue
    Add {
        #[arg(short, long)]
        station: String,
        /// Vehicle identifier
        #[arg(long)]
        vehicle: String,
        /// Station display name, defaults to the identifier
        #[arg(short, long)]
        name: Option<String>,
    },
}
