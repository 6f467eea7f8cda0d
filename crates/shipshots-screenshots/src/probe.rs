//! Image dimension probing.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{Result, ScreenshotError};

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Creates new dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Reads the pixel dimensions of an image file.
pub trait DimensionProbe: Send + Sync {
    /// Returns the dimensions of the image at `path`.
    fn probe(&self, path: &Path) -> Result<Dimensions>;
}

/// Probe backed by the `image` crate.
///
/// Only the image header is decoded, so probing large screenshots is cheap.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageProbe;

impl DimensionProbe for ImageProbe {
    fn probe(&self, path: &Path) -> Result<Dimensions> {
        let (width, height) =
            image::image_dimensions(path).map_err(|e| ScreenshotError::ProbeFailure {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if width == 0 || height == 0 {
            return Err(ScreenshotError::ProbeFailure {
                path: path.to_path_buf(),
                reason: "image has zero size".to_string(),
            });
        }

        trace!(path = %path.display(), width, height, "probed image");
        Ok(Dimensions::new(width, height))
    }
}

impl<P: DimensionProbe + ?Sized> DimensionProbe for &P {
    fn probe(&self, path: &Path) -> Result<Dimensions> {
        (**self).probe(path)
    }
}

/// Probe that reads `{WIDTHxHEIGHT}` from the file name instead of the file.
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FileNameProbe;

#[cfg(test)]
impl DimensionProbe for FileNameProbe {
    fn probe(&self, path: &Path) -> Result<Dimensions> {
        let failure = || ScreenshotError::ProbeFailure {
            path: path.to_path_buf(),
            reason: "no {WxH} marker in file name".to_string(),
        };
        let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(failure)?;
        let start = name.find('{').ok_or_else(failure)?;
        let end = name.find('}').ok_or_else(failure)?;
        let (w, h) = name[start + 1..end].split_once('x').ok_or_else(failure)?;
        let width = w.parse().map_err(|_| failure())?;
        let height = h.parse().map_err(|_| failure())?;
        Ok(Dimensions::new(width, height))
    }
}
