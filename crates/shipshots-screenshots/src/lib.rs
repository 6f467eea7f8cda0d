//! Screenshot classification and App Store screenshot synchronization.
//!
//! The crate has two halves:
//!
//! - the classifier ([`devices`], [`screen_size`], [`probe`], [`classify`]),
//!   which turns an image file into a canonical device/screen-size identity,
//! - the orchestrator ([`discovery`], [`sync`]), which collects screenshots
//!   from a directory tree and replaces a version's remote screenshots per
//!   language.
//!
//! ## Example
//!
//! ```no_run
//! use shipshots_screenshots::{
//!     discover, Classifier, DeviceRegistry, DiscoveryOptions, ImageProbe, STORE_LANGUAGES,
//! };
//! use std::path::Path;
//!
//! # fn example() -> shipshots_screenshots::Result<()> {
//! let classifier = Classifier::new(DeviceRegistry::builtin(), ImageProbe);
//! let languages: Vec<String> = STORE_LANGUAGES.iter().map(|l| l.to_string()).collect();
//! let discovery = discover(
//!     Path::new("fastlane/screenshots"),
//!     &languages,
//!     &classifier,
//!     &DiscoveryOptions::default(),
//! )?;
//! println!("found {} screenshots", discovery.screenshots.len());
//! # Ok(())
//! # }
//! ```

pub mod classify;
#[cfg(feature = "connect")]
pub mod connect;
pub mod devices;
pub mod discovery;
pub mod error;
pub mod probe;
pub mod screen_size;
pub mod screenshot;
pub mod sync;

pub use classify::{Classification, ClassificationSource, Classifier};
pub use devices::{DeviceCategory, DeviceProfile, DeviceRegistry};
pub use discovery::{discover, Discovery, DiscoveryOptions, SkipReason, SkippedScreenshot};
pub use error::ScreenshotError;
pub use probe::{DimensionProbe, Dimensions, ImageProbe};
pub use screen_size::ScreenSize;
pub use screenshot::{Screenshot, ScreenshotCandidate};
pub use sync::{
    CatalogCall, CatalogClient, IssueKind, LanguageReport, Orchestrator, RecordingCatalog,
    RecordingVersion, RemoteSlot, SaveReceipt, SoftIssue, StorePlatform, SyncAborted, SyncOptions,
    SyncPhase, SyncReport, VersionHandle, MAX_SLOTS_PER_DEVICE, STORE_LANGUAGES,
};

/// Result type alias for screenshot operations.
pub type Result<T> = std::result::Result<T, ScreenshotError>;
