//! Classify command

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::info;

use shipshots_screenshots::{Classifier, DimensionProbe, ImageProbe};

use crate::cli::{output, Cli, OutputFormat, Workspace};

/// Identify the device and screen size of one image
#[derive(Debug, Args)]
pub struct ClassifyCommand {
    /// Image file
    pub file: PathBuf,

    /// Device identifier to use instead of the image dimensions
    #[arg(short, long)]
    pub device: Option<String>,
}

impl ClassifyCommand {
    /// Execute the classify command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(file = %self.file.display(), device = ?self.device, "executing classify command");
        let workspace = Workspace::load()?;
        let classifier = Classifier::new(workspace.registry(), ImageProbe);

        let classification = classifier
            .classify(&self.file, self.device.as_deref())
            .with_context(|| format!("classifying {}", self.file.display()))?;
        let dimensions = ImageProbe.probe(&self.file).ok();

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "path": self.file.display().to_string(),
                    "screen_size": classification.screen_size,
                    "device_type": classification.device_type,
                    "source": classification.source,
                    "display_name": classification.screen_size.display_name(),
                    "dimensions": dimensions.map(|d| d.to_string()),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                println!(
                    "{} {}",
                    output::path_style().apply_to(self.file.display()),
                    output::device_style().apply_to(classification.screen_size)
                );
                if !cli.quiet {
                    println!("{}", output::key_value("device", &classification.device_type));
                    println!(
                        "{}",
                        output::key_value("name", classification.screen_size.display_name())
                    );
                    if let Some(dimensions) = dimensions {
                        println!("{}", output::key_value("dimensions", &dimensions.to_string()));
                    }
                    if cli.verbose {
                        println!(
                            "{}",
                            output::key_value("source", &format!("{:?}", classification.source))
                        );
                    }
                }
            }
        }

        Ok(())
    }
}
