//! Configuration and device table for the current directory

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use shipshots_core::{load_config_or_default, Config};
use shipshots_screenshots::{DeviceRegistry, DiscoveryOptions, SyncOptions};

/// Loaded configuration plus the device registry it selects.
pub struct Workspace {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    base_dir: PathBuf,
    custom_registry: Option<DeviceRegistry>,
}

impl Workspace {
    /// Load the configuration found from the current directory upwards.
    pub fn load() -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let (config, config_path) = load_config_or_default(&cwd)?;

        // Relative paths in a config file are relative to that file
        let base_dir = config_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or(cwd);

        let custom_registry = match &config.screenshots.device_types_file {
            Some(file) => {
                let file = base_dir.join(file);
                debug!(path = %file.display(), "loading device table");
                let registry = DeviceRegistry::from_json_file(&file)
                    .with_context(|| format!("loading device table {}", file.display()))?;
                Some(registry)
            }
            None => None,
        };

        Ok(Self {
            config,
            config_path,
            base_dir,
            custom_registry,
        })
    }

    /// The configured device table, or the built-in one.
    pub fn registry(&self) -> &DeviceRegistry {
        self.custom_registry
            .as_ref()
            .unwrap_or_else(|| DeviceRegistry::builtin())
    }

    /// Screenshot root: `explicit` relative to the working directory, else the configured path.
    pub fn screenshots_root(&self, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => path.to_path_buf(),
            None => self.base_dir.join(&self.config.screenshots.path),
        }
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            ignore_language_directory_validation: self
                .config
                .screenshots
                .ignore_language_directory_validation,
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            overwrite: self.config.screenshots.overwrite,
            skip_screenshots: self.config.screenshots.skip,
            edit_live: self.config.screenshots.edit_live,
        }
    }
}
