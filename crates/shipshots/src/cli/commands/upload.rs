//! Upload command

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use console::style;
use tracing::{info, warn};

use shipshots_core::ConfigError;
use shipshots_screenshots::connect::{AppStoreConnectClient, ConnectCredentials};
use shipshots_screenshots::{
    CatalogCall, CatalogClient, Classifier, ImageProbe, Orchestrator, RecordingCatalog,
    StorePlatform, SyncAborted, SyncOptions, SyncPhase, SyncReport,
};

use crate::cli::{output, Cli, OutputFormat, Workspace};

/// Replace the remote screenshots with the local tree
#[derive(Debug, Args)]
pub struct UploadCommand {
    /// Screenshot root (defaults to screenshots.path from the configuration)
    pub path: Option<PathBuf>,

    /// Bundle identifier (defaults to app.identifier from the configuration)
    #[arg(long)]
    pub app_id: Option<String>,

    /// Store platform: ios, appletvos or osx
    #[arg(long)]
    pub platform: Option<String>,

    /// Remove every existing screenshot of the uploaded languages first
    #[arg(long)]
    pub overwrite: bool,

    /// Run against an in-memory catalog and print the calls instead
    #[arg(long)]
    pub dry_run: bool,
}

impl UploadCommand {
    /// Execute the upload command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let workspace = Workspace::load()?;
        let root = workspace.screenshots_root(self.path.as_deref());

        let app = self
            .app_id
            .clone()
            .or_else(|| workspace.config.app.identifier.clone())
            .ok_or_else(|| ConfigError::MissingField("app.identifier".to_string()))?;
        let platform: StorePlatform = self
            .platform
            .as_deref()
            .unwrap_or(&workspace.config.app.platform)
            .parse()?;

        let mut options = workspace.sync_options();
        options.overwrite |= self.overwrite;

        info!(
            app = %app,
            platform = %platform,
            root = %root.display(),
            dry_run = self.dry_run,
            overwrite = options.overwrite,
            "executing upload command"
        );

        let run = SyncRun {
            app: &app,
            platform,
            root: &root,
            workspace: &workspace,
            options: &options,
        };

        if cli.chatty() {
            let mode = if self.dry_run { " (dry run)" } else { "" };
            output::info(&format!("Uploading screenshots for {} ({}){}", app, platform, mode));
        }

        let rt = tokio::runtime::Runtime::new()?;
        let spinner = output::spinner("Uploading screenshots", !cli.chatty());

        let (result, calls) = if self.dry_run {
            let catalog = RecordingCatalog::new();
            let result = rt.block_on(run.execute(&catalog));
            (result, Some(catalog.calls()))
        } else {
            let credentials = ConnectCredentials::from_env()?;
            let timeout = Duration::from_secs(workspace.config.connect.timeout_secs);
            let client = AppStoreConnectClient::new(credentials, timeout)?;
            (rt.block_on(run.execute(&client)), None)
        };

        spinner.finish_and_clear();

        match result {
            Ok(report) => {
                print_report(cli, &report, calls.as_deref(), self.dry_run, None)?;
                Ok(())
            }
            Err(aborted) => {
                warn!(phase = %aborted.failed_during, "upload aborted");
                print_report(
                    cli,
                    &aborted.report,
                    calls.as_deref(),
                    self.dry_run,
                    Some(&aborted.failed_during),
                )?;
                Err(aborted.into())
            }
        }
    }
}

/// Inputs of one synchronization, shared by the real and the dry-run catalog.
struct SyncRun<'a> {
    app: &'a str,
    platform: StorePlatform,
    root: &'a Path,
    workspace: &'a Workspace,
    options: &'a SyncOptions,
}

impl SyncRun<'_> {
    async fn execute<C: CatalogClient>(&self, client: &C) -> Result<SyncReport, SyncAborted> {
        let classifier = Classifier::new(self.workspace.registry(), ImageProbe);
        Orchestrator::new(client, self.app, self.platform)
            .discover_and_synchronize(
                self.root,
                &classifier,
                &self.workspace.discovery_options(),
                self.options,
            )
            .await
    }
}

fn print_report(
    cli: &Cli,
    report: &SyncReport,
    calls: Option<&[CatalogCall]>,
    dry_run: bool,
    failed_during: Option<&SyncPhase>,
) -> anyhow::Result<()> {
    if cli.format == OutputFormat::Json {
        let output = serde_json::json!({
            "success": failed_during.is_none(),
            "failed_during": failed_during,
            "dry_run": dry_run,
            "report": report,
            "calls": calls,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for issue in &report.issues {
        output::warning(&format!("{}: {}", issue.path.display(), issue.message));
    }

    if cli.quiet {
        return Ok(());
    }

    if let Some(calls) = calls {
        println!("{}", output::header("Catalog calls (dry run)"));
        for call in calls {
            println!("  {}", describe_call(call));
        }
        println!();
    }

    for (language, counts) in &report.languages {
        println!(
            "{}",
            output::key_value(
                language,
                &format!(
                    "{} uploaded, {} removed, {} skipped",
                    counts.uploaded,
                    counts.removed,
                    counts.skipped_overflow + counts.skipped_unsupported + counts.skipped_unframed
                )
            )
        );
    }

    match failed_during {
        None => output::success(&report.to_string()),
        Some(phase) => println!(
            "{} Stopped while {}; saved languages stay uploaded",
            style("✗").red().bold(),
            phase
        ),
    }
    Ok(())
}

fn describe_call(call: &CatalogCall) -> String {
    match call {
        CatalogCall::Fetch => "fetch editable version".to_string(),
        CatalogCall::Activate { languages } => format!("activate {}", languages.join(", ")),
        CatalogCall::Remove { slot } => format!(
            "remove {} {} #{}",
            slot.language, slot.device_type, slot.sort_order
        ),
        CatalogCall::Upload { path, slot } => format!(
            "upload {} -> {} {}{} #{}",
            path.display(),
            slot.language,
            slot.device_type,
            if slot.is_secondary_surface { " (iMessage)" } else { "" },
            slot.sort_order
        ),
        CatalogCall::Save => "save".to_string(),
    }
}
