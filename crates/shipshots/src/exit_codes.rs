//! Exit codes for the CLI

use shipshots_core::ConfigError;
use shipshots_screenshots::{ScreenshotError, SyncAborted};

/// Success
pub const SUCCESS: u8 = 0;

/// General error
pub const ERROR: u8 = 1;

/// Configuration error
pub const CONFIG_ERROR: u8 = 2;

/// Screenshot tree or image rejected
pub const VALIDATION_ERROR: u8 = 5;

/// Upload stopped partway
pub const UPLOAD_ERROR: u8 = 6;

/// Map an error chain to the exit code of its most specific cause.
pub fn for_error(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.downcast_ref::<SyncAborted>().is_some() {
            return UPLOAD_ERROR;
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return CONFIG_ERROR;
        }
        if let Some(e) = cause.downcast_ref::<ScreenshotError>() {
            return match e {
                ScreenshotError::InvalidRegistry(_) | ScreenshotError::UnknownPlatform(_) => {
                    CONFIG_ERROR
                }
                ScreenshotError::Remote(_) | ScreenshotError::NoEditableVersion(_) => UPLOAD_ERROR,
                ScreenshotError::Io(_) | ScreenshotError::Serialization(_) => ERROR,
                _ => VALIDATION_ERROR,
            };
        }
    }
    ERROR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specific_cause_wins() {
        let err = anyhow::Error::new(ScreenshotError::UnknownDeviceType("phablet".into()))
            .context("classifying file");
        assert_eq!(for_error(&err), VALIDATION_ERROR);

        let err = anyhow::Error::new(ConfigError::MissingField("app.identifier".into()));
        assert_eq!(for_error(&err), CONFIG_ERROR);

        let err = anyhow::anyhow!("something else");
        assert_eq!(for_error(&err), ERROR);
    }
}
