//! Init command

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use shipshots_core::config::defaults::{DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_YAML};

use crate::cli::{Cli, OutputFormat};

/// Initialize a new shipshots configuration
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(force = self.force, "executing init command");
        let cwd = std::env::current_dir()?;
        let config_path = self
            .output
            .clone()
            .unwrap_or_else(|| cwd.join(DEFAULT_CONFIG_YAML));

        if config_path.exists() && !self.force {
            anyhow::bail!(
                "Configuration file already exists at {}. Use --force to overwrite.",
                config_path.display()
            );
        }

        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "success": true,
                    "path": config_path.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text if !cli.quiet => {
                println!(
                    "{} Created configuration at {}",
                    style("✓").green().bold(),
                    style(config_path.display()).cyan()
                );
                println!();
                println!("Next steps:");
                println!("  1. Set app.identifier in {}", config_path.display());
                println!("  2. Run {} to check your screenshot folders", style("shipshots discover").cyan());
                println!("  3. Run {} to publish them", style("shipshots upload").cyan());
            }
            OutputFormat::Text => {}
        }

        Ok(())
    }
}
