//! Discover command

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use shipshots_screenshots::{discover, Classifier, ImageProbe, SkipReason, STORE_LANGUAGES};

use crate::cli::{output, Cli, OutputFormat, Workspace};

/// Walk a screenshot tree and list what would be uploaded
#[derive(Debug, Args)]
pub struct DiscoverCommand {
    /// Screenshot root (defaults to screenshots.path from the configuration)
    pub path: Option<PathBuf>,

    /// Accept folder names that are not store languages
    #[arg(long)]
    pub ignore_language_directory_validation: bool,
}

impl DiscoverCommand {
    /// Execute the discover command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let workspace = Workspace::load()?;
        let root = workspace.screenshots_root(self.path.as_deref());
        info!(root = %root.display(), "executing discover command");

        let mut options = workspace.discovery_options();
        options.ignore_language_directory_validation |= self.ignore_language_directory_validation;

        let languages: Vec<String> = STORE_LANGUAGES.iter().map(|l| l.to_string()).collect();
        let classifier = Classifier::new(workspace.registry(), ImageProbe);
        let discovery = discover(&root, &languages, &classifier, &options)?;

        if cli.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&discovery)?);
            return Ok(());
        }

        if cli.verbose {
            let config = workspace
                .config_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "defaults".to_string());
            println!("{}", output::key_value("config", &config));
            println!("{}", output::key_value("root", &root.display().to_string()));
        }

        for language in discovery.languages() {
            println!("{}", output::header(language));
            for shot in discovery.screenshots.iter().filter(|s| s.language() == language) {
                println!(
                    "  {:<28} {}",
                    output::device_style().apply_to(shot.formatted_name()),
                    output::path_style().apply_to(shot.file_path().display())
                );
            }
        }

        for skipped in &discovery.skipped {
            let reason = match skipped.reason {
                SkipReason::Unframed => "framed screenshots exist in the same folder",
                SkipReason::UnacceptedDevice => "device not accepted by App Store Connect",
            };
            output::warning(&format!(
                "Skipping {} ({})",
                skipped.path.display(),
                reason
            ));
        }

        if !cli.quiet {
            println!();
            println!(
                "{} {} screenshot(s) in {} language(s), {} skipped",
                style("✓").green().bold(),
                discovery.screenshots.len(),
                discovery.languages().len(),
                discovery.skipped.len()
            );
        }

        Ok(())
    }
}
