//! CLI parse: clap types for Canopy. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Canopy CLI - render a synchronized tree from an object model file
#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "Tree view synchronization for hierarchical object models")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over defaults and user config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the tree for a model file once all resolutions settle
    Render {
        /// Model file (.toml or .json)
        model: PathBuf,
        /// Root object id (defaults to the model's root)
        #[arg(long)]
        root: Option<String>,
        /// Object id to select
        #[arg(long)]
        select: Option<String>,
        /// Object ids to expand, in order
        #[arg(long)]
        expand: Vec<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Give up waiting for resolutions after this many milliseconds
        #[arg(long, default_value = "5000")]
        timeout_ms: u64,
    },
}
