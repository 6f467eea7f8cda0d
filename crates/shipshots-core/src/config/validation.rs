//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::Config;

/// Platforms the remote catalog accepts screenshots for
pub const VALID_PLATFORMS: &[&str] = &["ios", "appletvos", "osx"];

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_app(config)?;
    validate_screenshots(config)?;
    validate_connect(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_app(config: &Config) -> Result<()> {
    if !VALID_PLATFORMS.contains(&config.app.platform.as_str()) {
        return Err(ConfigError::invalid(
            "app.platform",
            format!("must be one of: {}", VALID_PLATFORMS.join(", ")),
        ));
    }

    if let Some(identifier) = &config.app.identifier {
        if identifier.trim().is_empty() {
            return Err(ConfigError::invalid(
                "app.identifier",
                "identifier cannot be empty",
            ));
        }
    }

    Ok(())
}

fn validate_screenshots(config: &Config) -> Result<()> {
    if config.screenshots.path.as_os_str().is_empty() {
        return Err(ConfigError::invalid(
            "screenshots.path",
            "path cannot be empty",
        ));
    }

    if config.screenshots.edit_live && config.screenshots.overwrite {
        return Err(ConfigError::invalid(
            "screenshots.overwrite",
            "cannot overwrite screenshots on the live version",
        ));
    }

    Ok(())
}

fn validate_connect(config: &Config) -> Result<()> {
    if config.connect.timeout_secs == 0 {
        return Err(ConfigError::invalid(
            "connect.timeout_secs",
            "timeout must be greater than zero",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_invalid_platform() {
        let mut config = Config::default();
        config.app.platform = "android".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("app.platform"));
    }

    #[test]
    fn test_empty_identifier() {
        let mut config = Config::default();
        config.app.identifier = Some("  ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_overwrite_live_rejected() {
        let mut config = Config::default();
        config.screenshots.edit_live = true;
        config.screenshots.overwrite = true;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("live version"));
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = Config::default();
        config.connect.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }
}
