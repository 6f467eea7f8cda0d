//! Editable App Store version with queued screenshot changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use super::client::{slots_for, AppStoreConnectClient};
use super::display_type;
use crate::sync::{RemoteSlot, SaveReceipt, VersionHandle};
use crate::{Result, ScreenshotError};

/// Remote mutations issued while a [`ConnectVersion`] is saved.
#[async_trait]
pub trait ScreenshotApi: Clone + Send + Sync {
    /// Create a localization for `locale`, returning its id.
    async fn create_localization(&self, version_id: &str, locale: &str) -> Result<String>;

    /// Create an empty screenshot set, returning its id.
    async fn create_screenshot_set(&self, localization_id: &str, display_type: &str) -> Result<String>;

    /// Upload `path` into a set, returning the new screenshot id.
    async fn upload_screenshot(&self, set_id: &str, path: &Path) -> Result<String>;

    async fn delete_screenshot(&self, screenshot_id: &str) -> Result<()>;

    /// Replace the order of the screenshots in a set.
    async fn reorder_screenshots(&self, set_id: &str, ids: &[String]) -> Result<()>;
}

/// Remote state of one localization.
#[derive(Debug, Clone)]
pub(super) struct LocalizationState {
    pub(super) id: String,
    pub(super) sets: Vec<ScreenshotSetState>,
}

/// Remote state of one screenshot set.
///
/// `screenshots` is indexed by position (`sort_order - 1`); removed entries
/// become `None` so later slots keep their position until the set is
/// reordered.
#[derive(Debug, Clone)]
pub(super) struct ScreenshotSetState {
    pub(super) id: String,
    pub(super) display_type: String,
    pub(super) screenshots: Vec<Option<String>>,
    pub(super) touched: bool,
}

impl ScreenshotSetState {
    fn position(sort_order: u32) -> usize {
        sort_order.saturating_sub(1) as usize
    }

    /// Clear `sort_order`, returning the screenshot that occupied it.
    pub(super) fn take(&mut self, sort_order: u32) -> Option<String> {
        let id = self
            .screenshots
            .get_mut(Self::position(sort_order))
            .and_then(Option::take);
        if id.is_some() {
            self.touched = true;
        }
        id
    }

    /// Put `id` at `sort_order`, growing the set as needed.
    pub(super) fn place(&mut self, sort_order: u32, id: String) {
        let position = Self::position(sort_order);
        if self.screenshots.len() <= position {
            self.screenshots.resize(position + 1, None);
        }
        self.screenshots[position] = Some(id);
        self.touched = true;
    }

    /// Remaining screenshot ids in position order.
    pub(super) fn ordered_ids(&self) -> Vec<String> {
        self.screenshots.iter().flatten().cloned().collect()
    }
}

#[derive(Debug)]
enum PendingChange {
    Remove(RemoteSlot),
    Upload(PathBuf, RemoteSlot),
}

/// An App Store version fetched for editing.
pub struct ConnectVersion<A = AppStoreConnectClient> {
    client: A,
    version_id: String,
    localizations: BTreeMap<String, LocalizationState>,
    slots: BTreeMap<String, Vec<RemoteSlot>>,
    activations: Vec<String>,
    pending: Vec<PendingChange>,
}

impl<A: ScreenshotApi> ConnectVersion<A> {
    pub(super) fn new(
        client: A,
        version_id: String,
        localizations: BTreeMap<String, LocalizationState>,
    ) -> Self {
        let slots = localizations
            .iter()
            .map(|(language, state)| (language.clone(), slots_for(language, &state.sets)))
            .collect();
        Self {
            client,
            version_id,
            localizations,
            slots,
            activations: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// App Store Connect identifier of the version.
    pub fn id(&self) -> &str {
        &self.version_id
    }

    async fn create_missing_localizations(&mut self) -> Result<()> {
        for language in std::mem::take(&mut self.activations) {
            if self.localizations.contains_key(&language) {
                continue;
            }
            info!(language = %language, "creating localization");
            let id = self.client.create_localization(&self.version_id, &language).await?;
            self.localizations.insert(
                language,
                LocalizationState {
                    id,
                    sets: Vec::new(),
                },
            );
        }
        Ok(())
    }

    async fn set_for(&mut self, slot: &RemoteSlot) -> Result<&mut ScreenshotSetState> {
        let display = display_type(&slot.device_type, slot.is_secondary_surface).ok_or_else(|| {
            ScreenshotError::UnknownDeviceType(slot.device_type.clone())
        })?;
        let localization = self.localizations.get_mut(&slot.language).ok_or_else(|| {
            ScreenshotError::remote(format!("language '{}' is not active", slot.language))
        })?;

        let index = match localization.sets.iter().position(|s| s.display_type == display) {
            Some(index) => index,
            None => {
                let id = self.client.create_screenshot_set(&localization.id, &display).await?;
                localization.sets.push(ScreenshotSetState {
                    id,
                    display_type: display,
                    screenshots: Vec::new(),
                    touched: false,
                });
                localization.sets.len() - 1
            }
        };
        Ok(&mut localization.sets[index])
    }

    async fn remove(&mut self, slot: &RemoteSlot) -> Result<()> {
        let Some(set_display_type) = display_type(&slot.device_type, slot.is_secondary_surface) else {
            return Ok(());
        };
        let Some(set) = self
            .localizations
            .get_mut(&slot.language)
            .and_then(|l| l.sets.iter_mut().find(|s| s.display_type == set_display_type))
        else {
            debug!(
                language = %slot.language,
                display_type = %set_display_type,
                "no screenshot set to clear"
            );
            return Ok(());
        };

        if let Some(id) = set.take(slot.sort_order) {
            debug!(screenshot = %id, "deleting screenshot");
            self.client.delete_screenshot(&id).await?;
        }
        Ok(())
    }

    async fn upload(&mut self, path: &Path, slot: &RemoteSlot) -> Result<()> {
        let client = self.client.clone();
        let set = self.set_for(slot).await?;

        if let Some(existing) = set.take(slot.sort_order) {
            debug!(screenshot = %existing, "replacing screenshot");
            client.delete_screenshot(&existing).await?;
        }

        let id = client.upload_screenshot(&set.id, path).await?;
        set.place(slot.sort_order, id);
        Ok(())
    }
}

#[async_trait]
impl<A: ScreenshotApi + 'static> VersionHandle for ConnectVersion<A> {
    fn screenshots(&self, language: &str) -> Option<&[RemoteSlot]> {
        self.slots.get(language).map(Vec::as_slice)
    }

    fn activate_languages(&mut self, languages: &[String]) {
        self.activations.extend(languages.iter().cloned());
    }

    async fn upload_screenshot(&mut self, file: Option<&Path>, slot: &RemoteSlot) -> Result<()> {
        let change = match file {
            Some(path) => PendingChange::Upload(path.to_path_buf(), slot.clone()),
            None => PendingChange::Remove(slot.clone()),
        };
        self.pending.push(change);
        Ok(())
    }

    async fn save(mut self) -> Result<SaveReceipt> {
        self.create_missing_localizations().await?;

        let pending = std::mem::take(&mut self.pending);

        // Removals address positions of the fetched state, so they run first.
        for change in &pending {
            if let PendingChange::Remove(slot) = change {
                self.remove(slot).await?;
            }
        }
        for change in &pending {
            if let PendingChange::Upload(path, slot) = change {
                info!(path = %path.display(), sort_order = slot.sort_order, "Uploading screenshot");
                self.upload(path, slot).await?;
            }
        }

        for localization in self.localizations.values() {
            for set in localization.sets.iter().filter(|s| s.touched) {
                self.client.reorder_screenshots(&set.id, &set.ordered_ids()).await?;
            }
        }

        Ok(SaveReceipt::issued())
    }
}
