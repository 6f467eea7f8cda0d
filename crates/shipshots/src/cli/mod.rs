//! CLI definition and command handling

pub mod commands;
pub mod output;
mod workspace;

use clap::{Parser, Subcommand};

use commands::{ClassifyCommand, DevicesCommand, DiscoverCommand, InitCommand, UploadCommand};

pub use workspace::Workspace;

/// Shipshots - App Store screenshot classification and upload CLI
#[derive(Debug, Parser)]
#[command(name = "shipshots")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize a new shipshots configuration
    Init(InitCommand),

    /// List the known devices and their accepted resolutions
    Devices(DevicesCommand),

    /// Identify the device and screen size of one image
    Classify(ClassifyCommand),

    /// Walk a screenshot tree and list what would be uploaded
    Discover(DiscoverCommand),

    /// Replace the remote screenshots with the local tree
    Upload(UploadCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Init(ref cmd) => cmd.execute(&self),
            Commands::Devices(ref cmd) => cmd.execute(&self),
            Commands::Classify(ref cmd) => cmd.execute(&self),
            Commands::Discover(ref cmd) => cmd.execute(&self),
            Commands::Upload(ref cmd) => cmd.execute(&self),
        }
    }

    /// Whether human-readable progress should be printed
    pub fn chatty(&self) -> bool {
        self.format == OutputFormat::Text && !self.quiet
    }
}
