//! Typed screenshot records.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::devices::DeviceRegistry;
use crate::screen_size::ScreenSize;
use crate::{Result, ScreenshotError};

/// File extensions accepted by the store.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Suffix appended to the display name of secondary-surface screenshots.
pub const SECONDARY_SURFACE_SUFFIX: &str = " (iMessage)";

/// Returns true if `path` has an accepted image extension, in any letter case.
pub fn has_allowed_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Unvalidated screenshot fields.
///
/// Use [`ScreenshotCandidate::validate`] to turn a candidate into a
/// [`Screenshot`]; there is no other way to obtain one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotCandidate {
    pub file_path: PathBuf,
    pub language: String,
    pub screen_size: Option<ScreenSize>,
    pub device_type: String,
    pub is_secondary_surface: bool,
}

impl ScreenshotCandidate {
    /// Why this candidate is invalid, if it is.
    pub fn invalid_reason(&self, registry: &DeviceRegistry) -> Option<String> {
        if !has_allowed_extension(&self.file_path) {
            return Some(format!(
                "extension must be one of {}",
                ALLOWED_EXTENSIONS.join(", ")
            ));
        }
        if self.is_secondary_surface {
            let supported = registry
                .get(&self.device_type)
                .map(|p| p.supports_secondary_surface)
                .unwrap_or(false);
            if !supported {
                return Some(format!(
                    "device '{}' does not support iMessage screenshots",
                    self.device_type
                ));
            }
        }
        if self.screen_size.is_none() {
            return Some("screen size could not be determined".to_string());
        }
        None
    }

    /// Returns true if the candidate satisfies every screenshot constraint.
    pub fn is_valid(&self, registry: &DeviceRegistry) -> bool {
        self.invalid_reason(registry).is_none()
    }

    /// Validate and build a [`Screenshot`].
    pub fn validate(self, registry: &DeviceRegistry) -> Result<Screenshot> {
        match (self.invalid_reason(registry), self.screen_size) {
            (None, Some(screen_size)) => Ok(Screenshot {
                file_path: self.file_path,
                language: self.language,
                screen_size,
                device_type: self.device_type,
                is_secondary_surface: self.is_secondary_surface,
            }),
            (reason, screen_size) => Err(ScreenshotError::InvalidScreenshot {
                path: self.file_path,
                screen_size: screen_size
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "an unknown screen size".to_string()),
                reason: reason.unwrap_or_else(|| "screen size could not be determined".to_string()),
            }),
        }
    }
}

/// A validated screenshot for one language and device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Screenshot {
    file_path: PathBuf,
    language: String,
    screen_size: ScreenSize,
    device_type: String,
    is_secondary_surface: bool,
}

impl Screenshot {
    /// Validate the fields and build a screenshot.
    pub fn new(
        file_path: impl Into<PathBuf>,
        language: impl Into<String>,
        screen_size: ScreenSize,
        device_type: impl Into<String>,
        is_secondary_surface: bool,
        registry: &DeviceRegistry,
    ) -> Result<Self> {
        ScreenshotCandidate {
            file_path: file_path.into(),
            language: language.into(),
            screen_size: Some(screen_size),
            device_type: device_type.into(),
            is_secondary_surface,
        }
        .validate(registry)
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn screen_size(&self) -> ScreenSize {
        self.screen_size
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn is_secondary_surface(&self) -> bool {
        self.is_secondary_surface
    }

    /// Human label, with the iMessage suffix for secondary-surface screenshots.
    pub fn formatted_name(&self) -> String {
        let name = self.screen_size.display_name();
        if self.is_secondary_surface {
            format!("{}{}", name, SECONDARY_SURFACE_SUFFIX)
        } else {
            name.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(path: &str, device: &str, size: Option<ScreenSize>, secondary: bool) -> ScreenshotCandidate {
        ScreenshotCandidate {
            file_path: PathBuf::from(path),
            language: "en-US".to_string(),
            screen_size: size,
            device_type: device.to_string(),
            is_secondary_surface: secondary,
        }
    }

    #[test]
    fn test_extensions_any_case() {
        for path in ["a.png", "a.PNG", "a.jpg", "a.JPG", "a.jpeg", "a.JPEG", "a.Png"] {
            assert!(has_allowed_extension(Path::new(path)), "{}", path);
        }
        for path in ["a.gif", "a.png.txt", "png", "a."] {
            assert!(!has_allowed_extension(Path::new(path)), "{}", path);
        }
    }

    #[test]
    fn test_is_valid() {
        let registry = DeviceRegistry::builtin();
        assert!(candidate("a.png", "iphone6", Some(ScreenSize::Ios47), false).is_valid(registry));
        assert!(candidate("a.png", "iphone6", Some(ScreenSize::Ios47), true).is_valid(registry));
        assert!(!candidate("a.gif", "iphone6", Some(ScreenSize::Ios47), false).is_valid(registry));
        assert!(!candidate("a.png", "iphone6", None, false).is_valid(registry));
    }

    #[test]
    fn test_secondary_surface_requires_support() {
        let registry = DeviceRegistry::builtin();
        let tv = candidate("tv.png", "appleTV", Some(ScreenSize::AppleTv), true);
        assert!(!tv.is_valid(registry));

        let err = tv.validate(registry).unwrap_err();
        match err {
            ScreenshotError::InvalidScreenshot { path, screen_size, reason } => {
                assert_eq!(path, PathBuf::from("tv.png"));
                assert_eq!(screen_size, "Apple-TV");
                assert!(reason.contains("appleTV"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_constructor_fails_loudly() {
        let registry = DeviceRegistry::builtin();
        assert!(Screenshot::new("a.tiff", "en-US", ScreenSize::Ios65, "iphone65", false, registry).is_err());
        assert!(Screenshot::new("a.png", "en-US", ScreenSize::Mac, "desktop", true, registry).is_err());
    }

    #[test]
    fn test_formatted_name() {
        let registry = DeviceRegistry::builtin();
        let plain = Screenshot::new("a.png", "de-DE", ScreenSize::Ios65, "iphone65", false, registry).unwrap();
        assert_eq!(plain.formatted_name(), "iPhone XS Max");

        let imessage = Screenshot::new("b.png", "de-DE", ScreenSize::IosIpadPro, "ipadPro129", true, registry).unwrap();
        assert_eq!(imessage.formatted_name(), "iPad Pro (iMessage)");
        assert_eq!(imessage.device_type(), "ipadPro129");
        assert_eq!(imessage.language(), "de-DE");
    }
}
