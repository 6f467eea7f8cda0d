//! Devices command

use clap::Args;
use console::style;
use serde::Serialize;

use shipshots_screenshots::{DeviceCategory, ScreenSize};

use crate::cli::{output, Cli, OutputFormat, Workspace};

/// List the known devices and their accepted resolutions
#[derive(Debug, Args)]
pub struct DevicesCommand {
    /// Only show devices of this category (phone, tablet, watch, tv, desktop)
    #[arg(long)]
    pub category: Option<String>,

    /// Also list resolutions accepted by more than one device
    #[arg(long)]
    pub shared: bool,
}

#[derive(Debug, Serialize)]
struct DeviceRow<'a> {
    identifier: &'a str,
    display_name: &'a str,
    category: DeviceCategory,
    screen_size: Option<ScreenSize>,
    resolutions: Vec<String>,
    supports_imessage: bool,
}

impl DevicesCommand {
    /// Execute the devices command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let workspace = Workspace::load()?;
        let registry = workspace.registry();

        let category = self
            .category
            .as_deref()
            .map(parse_category)
            .transpose()?;

        let rows: Vec<DeviceRow<'_>> = registry
            .profiles()
            .iter()
            .filter(|p| category.map_or(true, |c| p.category == c))
            .map(|p| DeviceRow {
                identifier: &p.identifier,
                display_name: &p.display_name,
                category: p.category,
                screen_size: ScreenSize::for_device_identifier(&p.identifier),
                resolutions: p
                    .accepted_resolutions
                    .iter()
                    .map(|(w, h)| format!("{}x{}", w, h))
                    .collect(),
                supports_imessage: p.supports_secondary_surface,
            })
            .collect();

        let shared: Vec<(String, Vec<&str>)> = if self.shared {
            registry
                .shared_resolutions()
                .into_iter()
                .map(|((w, h), devices)| (format!("{}x{}", w, h), devices))
                .collect()
        } else {
            Vec::new()
        };

        if cli.format == OutputFormat::Json {
            let output = serde_json::json!({
                "devices": rows,
                "shared_resolutions": shared
                    .iter()
                    .map(|(res, devices)| serde_json::json!({ "resolution": res, "devices": devices }))
                    .collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("{}", output::header("Devices"));
        for row in &rows {
            let size = row
                .screen_size
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let imessage = if row.supports_imessage {
                format!(" {}", style("(iMessage)").dim())
            } else {
                String::new()
            };
            println!(
                "  {:<14} {:<22} {}{}",
                output::device_style().apply_to(row.identifier),
                size,
                row.display_name,
                imessage
            );
            if cli.verbose {
                println!("{}", output::key_value("resolutions", &row.resolutions.join(", ")));
            }
        }

        if self.shared && !shared.is_empty() {
            println!();
            println!("{}", output::header("Shared resolutions"));
            for (resolution, devices) in &shared {
                println!("{}", output::key_value(resolution, &devices.join(", ")));
            }
        }

        Ok(())
    }
}

fn parse_category(value: &str) -> anyhow::Result<DeviceCategory> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| anyhow::anyhow!("Unknown device category '{}'", value))
}
