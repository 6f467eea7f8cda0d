//! App Store Connect backed catalog client.
//!
//! [`AppStoreConnectClient`] implements [`CatalogClient`](crate::CatalogClient)
//! over the App Store Connect REST API. Version handles queue language
//! activations, removals and uploads, and flush them in that order when
//! saved.

mod client;
mod version;

pub use client::AppStoreConnectClient;
pub use version::{ConnectVersion, ScreenshotApi};

use std::path::Path;

use crate::{Result, ScreenshotError};

/// API credentials for App Store Connect.
#[derive(Debug, Clone)]
pub struct ConnectCredentials {
    /// The API Key ID (from App Store Connect).
    pub api_key_id: String,
    /// The API Issuer ID (from App Store Connect).
    pub api_issuer_id: String,
    /// The private key content in PEM format.
    pub api_private_key: String,
}

impl ConnectCredentials {
    /// Read credentials from the environment.
    ///
    /// Looks for:
    /// - `APP_STORE_CONNECT_API_KEY_ID`
    /// - `APP_STORE_CONNECT_ISSUER_ID`
    /// - `APP_STORE_CONNECT_API_KEY` (the PEM content or path to .p8 file)
    pub fn from_env() -> Result<Self> {
        let api_key_id = required_env("APP_STORE_CONNECT_API_KEY_ID")?;
        let api_issuer_id = required_env("APP_STORE_CONNECT_ISSUER_ID")?;
        let api_key_env = required_env("APP_STORE_CONNECT_API_KEY")?;

        let api_private_key = if Path::new(&api_key_env).exists() {
            std::fs::read_to_string(&api_key_env).map_err(|e| {
                ScreenshotError::remote(format!("Failed to read API key file: {}", e))
            })?
        } else {
            api_key_env
        };

        Ok(Self {
            api_key_id,
            api_issuer_id,
            api_private_key,
        })
    }
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| ScreenshotError::remote(format!("{} not set", name)))
}

/// Device identifiers and their App Store Connect display types.
const DISPLAY_TYPES: &[(&str, &str)] = &[
    ("iphone35", "APP_IPHONE_35"),
    ("iphone4", "APP_IPHONE_40"),
    ("iphone6", "APP_IPHONE_47"),
    ("iphone6Plus", "APP_IPHONE_55"),
    ("iphone58", "APP_IPHONE_58"),
    ("iphone65", "APP_IPHONE_65"),
    ("ipad", "APP_IPAD_97"),
    ("ipad105", "APP_IPAD_105"),
    ("ipadPro", "APP_IPAD_PRO_129"),
    ("ipadPro11", "APP_IPAD_PRO_3GEN_11"),
    ("ipadPro129", "APP_IPAD_PRO_3GEN_129"),
    ("watch", "APP_WATCH_SERIES_3"),
    ("watchSeries4", "APP_WATCH_SERIES_4"),
    ("appleTV", "APP_APPLE_TV"),
    ("desktop", "APP_DESKTOP"),
];

const IMESSAGE_PREFIX: &str = "IMESSAGE_";

/// Screenshot display type for a device, e.g. `iphone65 → APP_IPHONE_65`.
///
/// iMessage variants carry an `IMESSAGE_` prefix. Raw display types pass
/// through unchanged so slots read from the service can be removed again.
pub fn display_type(device_type: &str, is_secondary_surface: bool) -> Option<String> {
    if device_type.starts_with("APP_") || device_type.starts_with(IMESSAGE_PREFIX) {
        return Some(device_type.to_string());
    }
    let (_, display) = DISPLAY_TYPES.iter().find(|(d, _)| *d == device_type)?;
    if is_secondary_surface {
        Some(format!("{}{}", IMESSAGE_PREFIX, display))
    } else {
        Some(display.to_string())
    }
}

/// Device identifier and iMessage flag for a display type.
///
/// Display types without a device identifier are returned as-is.
pub fn slot_identity(display_type: &str) -> (String, bool) {
    let (base, secondary) = match display_type.strip_prefix(IMESSAGE_PREFIX) {
        Some(base) => (base, true),
        None => (display_type, false),
    };
    match DISPLAY_TYPES.iter().find(|(_, d)| *d == base) {
        Some((device, _)) => (device.to_string(), secondary),
        None => (display_type.to_string(), secondary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_types() {
        assert_eq!(display_type("iphone65", false).as_deref(), Some("APP_IPHONE_65"));
        assert_eq!(display_type("ipadPro", true).as_deref(), Some("IMESSAGE_APP_IPAD_PRO_129"));
        assert_eq!(display_type("desktop", false).as_deref(), Some("APP_DESKTOP"));
        assert_eq!(display_type("APP_IPHONE_67", false).as_deref(), Some("APP_IPHONE_67"));
        assert_eq!(display_type("iphone61", false), None);
    }

    #[test]
    fn test_slot_identity_round_trip() {
        for (device, _) in DISPLAY_TYPES {
            for secondary in [false, true] {
                let display = display_type(device, secondary).unwrap();
                assert_eq!(slot_identity(&display), (device.to_string(), secondary));
            }
        }
        assert_eq!(
            slot_identity("APP_IPHONE_67"),
            ("APP_IPHONE_67".to_string(), false)
        );
        assert_eq!(
            display_type(&slot_identity("APP_IPHONE_67").0, false).as_deref(),
            Some("APP_IPHONE_67")
        );
    }
}
