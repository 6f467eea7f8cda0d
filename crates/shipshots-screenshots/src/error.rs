//! Error types for screenshot classification and synchronization.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while classifying, discovering or uploading screenshots.
#[derive(Debug, Error)]
pub enum ScreenshotError {
    /// The image header could not be read.
    #[error("Could not find or parse file at path '{}': {reason}", .path.display())]
    ProbeFailure { path: PathBuf, reason: String },

    /// No device profile accepts these pixel dimensions.
    #[error("Unsupported screen size {width}x{height} for path '{}'", .path.display())]
    UnsupportedDimensions {
        width: u32,
        height: u32,
        path: PathBuf,
    },

    /// A screenshot failed validation at construction time.
    #[error("The screenshot '{}' does not match the requirements of {screen_size}: {reason}", .path.display())]
    InvalidScreenshot {
        path: PathBuf,
        screen_size: String,
        reason: String,
    },

    /// A device identifier is not present in the registry.
    #[error("Unknown device type: {0}")]
    UnknownDeviceType(String),

    /// A language folder name is not an available store language.
    #[error("{language} is not an available language (folder '{}')", .path.display())]
    UnknownLanguage { language: String, path: PathBuf },

    /// Folders under the screenshot root that are neither languages nor reserved names.
    #[error("Unsupported directory name(s) for screenshots in '{}': {}", .root.display(), .names.join(", "))]
    InvalidLanguageFolders { root: PathBuf, names: Vec<String> },

    /// The screenshot root does not exist or is not a directory.
    #[error("Screenshot directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// A store platform name was not recognized.
    #[error("Unknown platform '{0}', expected one of: ios, appletvos, osx")]
    UnknownPlatform(String),

    /// The remote catalog has no version that can be edited.
    #[error("Could not find a version to edit for app '{0}'")]
    NoEditableVersion(String),

    /// The device table is malformed.
    #[error("Invalid device registry: {0}")]
    InvalidRegistry(String),

    /// The remote catalog rejected a request.
    #[error("Remote catalog error: {0}")]
    Remote(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ScreenshotError {
    /// Shorthand for a remote catalog error
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }
}

impl From<serde_json::Error> for ScreenshotError {
    fn from(err: serde_json::Error) -> Self {
        ScreenshotError::Serialization(err.to_string())
    }
}

impl From<walkdir::Error> for ScreenshotError {
    fn from(err: walkdir::Error) -> Self {
        let message = err.to_string();
        match err.into_io_error() {
            Some(io) => ScreenshotError::Io(io),
            None => ScreenshotError::Io(std::io::Error::other(message)),
        }
    }
}
