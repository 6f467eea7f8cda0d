//! Shipshots Core - configuration and shared errors
//!
//! This crate provides the configuration model, the config file loader,
//! and the error types used by the shipshots CLI.

pub mod config;
pub mod error;

pub use config::{
    find_config, load_config, load_config_from_dir, load_config_or_default, AppConfig, Config,
    ConnectConfig, ScreenshotsConfig,
};
pub use error::{ConfigError, Result};
