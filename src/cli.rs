use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronize every catalog in a directory once
    Sync {
        /// Catalog directory
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Source language tag
        #[arg(short, long)]
        source: Option<String>,

        /// Target language tags (comma-separated)
        #[arg(short, long)]
        targets: Option<String>,

        /// Translation gateway mode
        #[arg(long, default_value = "ollama")]
        gateway: String,
    },

    /// Report which catalogs changed since the last sync
    Status {
        /// Catalog directory
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Check that the translation gateway is reachable
    Check,
}
