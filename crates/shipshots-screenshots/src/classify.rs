//! Resolve image files to a canonical device and screen size.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::devices::DeviceRegistry;
use crate::probe::DimensionProbe;
use crate::screen_size::ScreenSize;
use crate::screenshot::{Screenshot, ScreenshotCandidate};
use crate::{Result, ScreenshotError};

/// How a classification was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// A device identifier passed by the caller.
    ExplicitHint,
    /// The name of the file's parent directory.
    DirectoryHint,
    /// The image's pixel dimensions.
    Dimensions,
}

/// Device identity of one image file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub screen_size: ScreenSize,
    pub device_type: String,
    pub source: ClassificationSource,
}

/// Classifies image files against a device registry.
pub struct Classifier<'r, P> {
    registry: &'r DeviceRegistry,
    probe: P,
}

impl<'r, P: DimensionProbe> Classifier<'r, P> {
    /// Create a classifier over `registry` using `probe` for dimensions.
    pub fn new(registry: &'r DeviceRegistry, probe: P) -> Self {
        Self { registry, probe }
    }

    /// The registry this classifier resolves against.
    pub fn registry(&self) -> &'r DeviceRegistry {
        self.registry
    }

    /// First category whose resolutions list `(width, height)` exactly.
    pub fn screen_size_for_dimensions(&self, width: u32, height: u32, path: &Path) -> Result<ScreenSize> {
        ScreenSize::for_dimensions(self.registry, width, height).ok_or_else(|| {
            ScreenshotError::UnsupportedDimensions {
                width,
                height,
                path: path.to_path_buf(),
            }
        })
    }

    /// Resolve `path` to a screen size and device identifier.
    ///
    /// An explicit `hint` must name a registered device. Without one, a parent
    /// directory named after a registered device is used instead, and the
    /// image is only probed when neither applies.
    pub fn classify(&self, path: &Path, hint: Option<&str>) -> Result<Classification> {
        let hinted = match hint {
            Some(device) if self.registry.contains(device) => {
                Some((device.to_string(), ClassificationSource::ExplicitHint))
            }
            Some(device) => return Err(ScreenshotError::UnknownDeviceType(device.to_string())),
            None => parent_dir_name(path)
                .filter(|name| self.registry.contains(name))
                .map(|name| (name.to_string(), ClassificationSource::DirectoryHint)),
        };

        if let Some((device_type, source)) = hinted {
            let screen_size = ScreenSize::for_device_identifier(&device_type).ok_or_else(|| {
                ScreenshotError::InvalidScreenshot {
                    path: path.to_path_buf(),
                    screen_size: "an unknown screen size".to_string(),
                    reason: format!("device '{}' has no screen size category", device_type),
                }
            })?;
            debug!(path = %path.display(), device = %device_type, "classified by device hint");
            return Ok(Classification {
                screen_size,
                device_type,
                source,
            });
        }

        let dims = self.probe.probe(path)?;
        let screen_size = self.screen_size_for_dimensions(dims.width, dims.height, path)?;
        debug!(
            path = %path.display(),
            dimensions = %dims,
            screen_size = %screen_size,
            "classified by dimensions"
        );
        Ok(Classification {
            screen_size,
            device_type: screen_size.device_identifier().to_string(),
            source: ClassificationSource::Dimensions,
        })
    }

    /// Classify `path` and build a validated [`Screenshot`] for `language`.
    pub fn classify_with_surface(
        &self,
        path: &Path,
        hint: Option<&str>,
        language: &str,
        is_secondary_surface: bool,
    ) -> Result<Screenshot> {
        let classification = self.classify(path, hint)?;
        ScreenshotCandidate {
            file_path: path.to_path_buf(),
            language: language.to_string(),
            screen_size: Some(classification.screen_size),
            device_type: classification.device_type,
            is_secondary_surface,
        }
        .validate(self.registry)
    }
}

fn parent_dir_name(path: &Path) -> Option<&str> {
    path.parent()?.file_name()?.to_str()
}
