use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidmirror")]
#[command(author, version, about = "Mirror a raw media tree into a public tree, converting videos to WebM")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one synchronization pass
    Sync {
        /// Override the source root from the config
        #[arg(long)]
        source: Option<PathBuf>,

        /// Override the output root from the config
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Report lock state and root availability (read-only)
    Status,

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
