//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for shipshots
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Version of the config schema
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Target app
    pub app: AppConfig,

    /// Screenshot discovery and upload settings
    pub screenshots: ScreenshotsConfig,

    /// App Store Connect client settings
    pub connect: ConnectConfig,
}

/// Target app configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Bundle identifier (e.g. "com.example.app")
    pub identifier: Option<String>,

    /// Store platform: "ios", "appletvos" or "osx"
    pub platform: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            identifier: None,
            platform: "ios".to_string(),
        }
    }
}

/// Screenshot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotsConfig {
    /// Root directory holding one folder per language
    #[serde(default = "default_screenshots_path")]
    pub path: PathBuf,

    /// Remove every existing remote screenshot before uploading
    pub overwrite: bool,

    /// Skip the screenshot step entirely
    pub skip: bool,

    /// Accept language folders whose names don't look like locale codes
    pub ignore_language_directory_validation: bool,

    /// Work against the live version (screenshots can't be changed there)
    pub edit_live: bool,

    /// Optional JSON file replacing the built-in device table
    pub device_types_file: Option<PathBuf>,
}

fn default_screenshots_path() -> PathBuf {
    PathBuf::from("./screenshots")
}

impl Default for ScreenshotsConfig {
    fn default() -> Self {
        Self {
            path: default_screenshots_path(),
            overwrite: false,
            skip: false,
            ignore_language_directory_validation: false,
            edit_live: false,
            device_types_file: None,
        }
    }
}

/// App Store Connect client settings.
///
/// Credentials are never stored here; they come from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
        }
    }
}
