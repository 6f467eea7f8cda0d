//! In-memory catalog that records every call.
//!
//! Used for dry runs and tests. Changes only become visible to a newly
//! fetched version after [`VersionHandle::save`], the same way the real
//! service behaves.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::{CatalogClient, RemoteSlot, SaveReceipt, StorePlatform, VersionHandle, STORE_LANGUAGES};
use crate::{Result, ScreenshotError};

/// A call made against a [`RecordingCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum CatalogCall {
    Fetch,
    Activate { languages: Vec<String> },
    Remove { slot: RemoteSlot },
    Upload { path: PathBuf, slot: RemoteSlot },
    Save,
}

#[derive(Debug)]
enum Pending {
    Remove(RemoteSlot),
    Upload(RemoteSlot),
}

#[derive(Debug)]
struct CatalogState {
    remote: BTreeMap<String, Vec<RemoteSlot>>,
    available: Vec<String>,
    calls: Vec<CatalogCall>,
    has_version: bool,
    fail_on_save: Option<usize>,
    saves: usize,
}

/// In-memory [`CatalogClient`] for dry runs and tests.
#[derive(Debug, Clone)]
pub struct RecordingCatalog {
    state: Arc<Mutex<CatalogState>>,
}

impl Default for RecordingCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingCatalog {
    /// An editable version with no active languages, accepting all store languages.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(CatalogState {
                remote: BTreeMap::new(),
                available: STORE_LANGUAGES.iter().map(|l| l.to_string()).collect(),
                calls: Vec::new(),
                has_version: true,
                fail_on_save: None,
                saves: 0,
            })),
        }
    }

    /// Replace the accepted languages.
    pub fn with_languages<I, S>(self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().available = languages.into_iter().map(Into::into).collect();
        self
    }

    /// Add an existing remote screenshot, activating its language.
    pub fn with_slot(self, slot: RemoteSlot) -> Self {
        self.lock()
            .remote
            .entry(slot.language.clone())
            .or_default()
            .push(slot);
        self
    }

    /// Mark a language active with no screenshots.
    pub fn with_active_language(self, language: &str) -> Self {
        self.lock().remote.entry(language.to_string()).or_default();
        self
    }

    /// Report that no editable version exists.
    pub fn without_version(self) -> Self {
        self.lock().has_version = false;
        self
    }

    /// Reject the `n`th save (1-based).
    pub fn fail_on_save(self, n: usize) -> Self {
        self.lock().fail_on_save = Some(n);
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<CatalogCall> {
        self.lock().calls.clone()
    }

    /// Persisted slots of `language`.
    pub fn remote_slots(&self, language: &str) -> Vec<RemoteSlot> {
        self.lock().remote.get(language).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Version handle of a [`RecordingCatalog`].
#[derive(Debug)]
pub struct RecordingVersion {
    state: Arc<Mutex<CatalogState>>,
    snapshot: BTreeMap<String, Vec<RemoteSlot>>,
    activations: Vec<String>,
    pending: Vec<Pending>,
}

impl RecordingVersion {
    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl VersionHandle for RecordingVersion {
    fn screenshots(&self, language: &str) -> Option<&[RemoteSlot]> {
        self.snapshot.get(language).map(Vec::as_slice)
    }

    fn activate_languages(&mut self, languages: &[String]) {
        self.lock().calls.push(CatalogCall::Activate {
            languages: languages.to_vec(),
        });
        self.activations.extend(languages.iter().cloned());
    }

    async fn upload_screenshot(&mut self, file: Option<&Path>, slot: &RemoteSlot) -> Result<()> {
        let call = match file {
            Some(path) => {
                self.pending.push(Pending::Upload(slot.clone()));
                CatalogCall::Upload {
                    path: path.to_path_buf(),
                    slot: slot.clone(),
                }
            }
            None => {
                self.pending.push(Pending::Remove(slot.clone()));
                CatalogCall::Remove { slot: slot.clone() }
            }
        };
        self.lock().calls.push(call);
        Ok(())
    }

    async fn save(self) -> Result<SaveReceipt> {
        let mut state = self.lock();
        state.calls.push(CatalogCall::Save);
        state.saves += 1;
        if state.fail_on_save == Some(state.saves) {
            return Err(ScreenshotError::remote(format!(
                "save #{} rejected",
                state.saves
            )));
        }

        for language in &self.activations {
            state.remote.entry(language.clone()).or_default();
        }
        for change in &self.pending {
            match change {
                Pending::Remove(slot) => {
                    if let Some(slots) = state.remote.get_mut(&slot.language) {
                        slots.retain(|s| s != slot);
                    }
                }
                Pending::Upload(slot) => {
                    let slots = state.remote.entry(slot.language.clone()).or_default();
                    slots.retain(|s| {
                        !(s.sort_order == slot.sort_order
                            && s.device_type == slot.device_type
                            && s.is_secondary_surface == slot.is_secondary_surface)
                    });
                    slots.push(slot.clone());
                }
            }
        }
        debug!(changes = self.pending.len(), "recorded save");
        Ok(SaveReceipt::issued())
    }
}

#[async_trait]
impl CatalogClient for RecordingCatalog {
    type Version = RecordingVersion;

    async fn fetch_editable_version(
        &self,
        _app: &str,
        _platform: StorePlatform,
    ) -> Result<Option<RecordingVersion>> {
        let mut state = self.lock();
        state.calls.push(CatalogCall::Fetch);
        if !state.has_version {
            return Ok(None);
        }
        Ok(Some(RecordingVersion {
            state: Arc::clone(&self.state),
            snapshot: state.remote.clone(),
            activations: Vec::new(),
            pending: Vec::new(),
        }))
    }

    async fn available_languages(&self) -> Result<Vec<String>> {
        Ok(self.lock().available.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(order: u32, language: &str) -> RemoteSlot {
        RemoteSlot {
            sort_order: order,
            language: language.to_string(),
            device_type: "iphone65".to_string(),
            is_secondary_surface: false,
        }
    }

    #[tokio::test]
    async fn test_changes_visible_only_after_save() {
        let catalog = RecordingCatalog::new();
        let mut version = catalog
            .fetch_editable_version("app", StorePlatform::Ios)
            .await
            .unwrap()
            .unwrap();

        version.activate_languages(&["en-US".to_string()]);
        version
            .upload_screenshot(Some(Path::new("a.png")), &slot(1, "en-US"))
            .await
            .unwrap();
        assert!(version.screenshots("en-US").is_none());
        assert!(catalog.remote_slots("en-US").is_empty());

        let receipt = version.save().await.unwrap();
        let fresh = catalog
            .refetch("app", StorePlatform::Ios, receipt)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fresh.screenshots("en-US").unwrap(), &[slot(1, "en-US")]);
    }

    #[tokio::test]
    async fn test_removal_and_failing_save() {
        let catalog = RecordingCatalog::new()
            .with_slot(slot(1, "de-DE"))
            .with_slot(slot(2, "de-DE"))
            .fail_on_save(2);

        let mut version = catalog
            .fetch_editable_version("app", StorePlatform::Ios)
            .await
            .unwrap()
            .unwrap();
        version.upload_screenshot(None, &slot(1, "de-DE")).await.unwrap();
        version.save().await.unwrap();
        assert_eq!(catalog.remote_slots("de-DE"), vec![slot(2, "de-DE")]);

        let version = catalog
            .fetch_editable_version("app", StorePlatform::Ios)
            .await
            .unwrap()
            .unwrap();
        assert!(version.save().await.is_err());
        assert_eq!(catalog.calls().iter().filter(|c| **c == CatalogCall::Save).count(), 2);
    }

    #[tokio::test]
    async fn test_without_version() {
        let catalog = RecordingCatalog::new().without_version();
        assert!(catalog
            .fetch_editable_version("app", StorePlatform::Ios)
            .await
            .unwrap()
            .is_none());
        assert_eq!(catalog.calls(), vec![CatalogCall::Fetch]);
    }
}
