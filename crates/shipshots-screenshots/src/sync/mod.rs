//! Screenshot synchronization with a remote catalog.
//!
//! The remote catalog is reached through two traits: [`CatalogClient`]
//! fetches an editable [`VersionHandle`], and the handle queues mutations
//! until [`VersionHandle::save`] persists them. Saving consumes the handle
//! and yields a [`SaveReceipt`], which is the only way to ask the client for
//! a fresh one. A handle can therefore never be reused after the server has
//! rewritten its identifiers.
//!
//! ## Example
//!
//! ```no_run
//! use shipshots_screenshots::{
//!     discover, Classifier, DeviceRegistry, DiscoveryOptions, ImageProbe, Orchestrator,
//!     RecordingCatalog, StorePlatform, SyncOptions, CatalogClient,
//! };
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let catalog = RecordingCatalog::new();
//! let languages = catalog.available_languages().await?;
//!
//! let classifier = Classifier::new(DeviceRegistry::builtin(), ImageProbe);
//! let discovery = discover(
//!     Path::new("screenshots"),
//!     &languages,
//!     &classifier,
//!     &DiscoveryOptions::default(),
//! )?;
//!
//! let orchestrator = Orchestrator::new(&catalog, "com.example.app", StorePlatform::Ios);
//! let options = SyncOptions { overwrite: true, ..Default::default() };
//! let report = orchestrator.synchronize(&discovery, &options).await?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```

mod orchestrator;
mod recording;
mod report;

pub use orchestrator::{Orchestrator, SyncAborted, MAX_SLOTS_PER_DEVICE};
pub use recording::{CatalogCall, RecordingCatalog, RecordingVersion};
pub use report::{IssueKind, LanguageReport, SoftIssue, SyncPhase, SyncReport};

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Result, ScreenshotError};

/// Language codes accepted by the App Store.
pub const STORE_LANGUAGES: &[&str] = &[
    "ar-SA", "ca", "cs", "da", "de-DE", "el", "en-AU", "en-CA", "en-GB", "en-US", "es-ES", "es-MX",
    "fi", "fr-CA", "fr-FR", "he", "hi", "hr", "hu", "id", "it", "ja", "ko", "ms", "nl-NL", "no",
    "pl", "pt-BR", "pt-PT", "ro", "ru", "sk", "sv", "th", "tr", "uk", "vi", "zh-Hans", "zh-Hant",
];

/// Store platform of the version being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorePlatform {
    #[default]
    Ios,
    #[serde(rename = "appletvos")]
    AppleTvOs,
    Osx,
}

impl StorePlatform {
    /// Value used by App Store Connect's `platform` filter.
    pub fn as_connect_str(&self) -> &'static str {
        match self {
            StorePlatform::Ios => "IOS",
            StorePlatform::AppleTvOs => "TV_OS",
            StorePlatform::Osx => "MAC_OS",
        }
    }
}

impl fmt::Display for StorePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StorePlatform::Ios => "ios",
            StorePlatform::AppleTvOs => "appletvos",
            StorePlatform::Osx => "osx",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for StorePlatform {
    type Err = ScreenshotError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ios" => Ok(StorePlatform::Ios),
            "appletvos" => Ok(StorePlatform::AppleTvOs),
            "osx" | "macos" => Ok(StorePlatform::Osx),
            _ => Err(ScreenshotError::UnknownPlatform(s.to_string())),
        }
    }
}

/// A remote upload position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteSlot {
    /// 1-based position within the (language, device) set.
    pub sort_order: u32,
    pub language: String,
    pub device_type: String,
    pub is_secondary_surface: bool,
}

/// Proof that a version handle was saved.
///
/// Only the crate's [`VersionHandle::save`] implementations create receipts,
/// and [`CatalogClient::refetch`] consumes one. Callers cannot mint their own:
///
/// ```compile_fail
/// let receipt = shipshots_screenshots::SaveReceipt::issued();
/// ```
#[derive(Debug)]
pub struct SaveReceipt {
    _private: (),
}

impl SaveReceipt {
    /// Issue a receipt. Call this only after pending changes were persisted.
    pub(crate) fn issued() -> Self {
        Self { _private: () }
    }
}

/// Options for a synchronization run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Remove every existing remote screenshot of the discovered languages first.
    pub overwrite: bool,
    /// Do nothing.
    pub skip_screenshots: bool,
    /// The live version is being edited; screenshots cannot change.
    pub edit_live: bool,
}

/// An editable version on the remote catalog.
#[async_trait]
pub trait VersionHandle: Send + Sized {
    /// Current slots of `language`, or `None` if the language is not active.
    fn screenshots(&self, language: &str) -> Option<&[RemoteSlot]>;

    /// Queue activation of `languages`. Takes effect on [`save`](Self::save).
    fn activate_languages(&mut self, languages: &[String]);

    /// Queue an upload of `file` into `slot`, or a removal when `file` is `None`.
    async fn upload_screenshot(&mut self, file: Option<&Path>, slot: &RemoteSlot) -> Result<()>;

    /// Persist queued changes. The handle is stale afterwards.
    async fn save(self) -> Result<SaveReceipt>;
}

/// Client of the remote catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    type Version: VersionHandle;

    /// The version that can be edited, if any.
    async fn fetch_editable_version(
        &self,
        app: &str,
        platform: StorePlatform,
    ) -> Result<Option<Self::Version>>;

    /// Fetch the version again after a save.
    async fn refetch(
        &self,
        app: &str,
        platform: StorePlatform,
        receipt: SaveReceipt,
    ) -> Result<Option<Self::Version>> {
        drop(receipt);
        self.fetch_editable_version(app, platform).await
    }

    /// Language codes the catalog accepts.
    async fn available_languages(&self) -> Result<Vec<String>>;
}
