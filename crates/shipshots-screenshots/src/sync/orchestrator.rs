//! Replace a version's screenshots, one language at a time.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::report::{IssueKind, SoftIssue, SyncPhase, SyncReport};
use super::{CatalogClient, RemoteSlot, SaveReceipt, StorePlatform, SyncOptions, VersionHandle};
use crate::classify::Classifier;
use crate::discovery::{discover, Discovery, DiscoveryOptions};
use crate::probe::DimensionProbe;
use crate::screenshot::Screenshot;
use crate::{Result, ScreenshotError};

/// Screenshots the store accepts per device and language.
pub const MAX_SLOTS_PER_DEVICE: u32 = 10;

/// A run that stopped on a fatal error.
///
/// Languages saved before the failure stay applied remotely; `report`
/// describes them.
#[derive(Debug, Error)]
#[error("Screenshot upload failed while {failed_during}: {source}")]
pub struct SyncAborted {
    pub report: SyncReport,
    pub failed_during: SyncPhase,
    pub source: ScreenshotError,
}

/// Drives a synchronization run against a [`CatalogClient`].
pub struct Orchestrator<'c, C> {
    client: &'c C,
    app: String,
    platform: StorePlatform,
}

/// Discovered screenshots grouped by language, with slot counters.
struct UploadPlan<'d> {
    groups: Vec<(&'d str, Vec<&'d Screenshot>)>,
    slots: SlotIndexer,
}

impl<'d> UploadPlan<'d> {
    fn new(discovery: &'d Discovery) -> Self {
        let mut groups: Vec<(&'d str, Vec<&'d Screenshot>)> = Vec::new();
        for shot in &discovery.screenshots {
            match groups.iter_mut().find(|(language, _)| *language == shot.language()) {
                Some((_, shots)) => shots.push(shot),
                None => groups.push((shot.language(), vec![shot])),
            }
        }
        Self {
            groups,
            slots: SlotIndexer::default(),
        }
    }

    fn languages(&self) -> Vec<String> {
        self.groups.iter().map(|(l, _)| l.to_string()).collect()
    }
}

/// 1-based running counter per (language, display name).
#[derive(Debug, Default)]
struct SlotIndexer {
    counters: HashMap<(String, String), u32>,
}

impl SlotIndexer {
    fn next(&mut self, language: &str, name: &str) -> u32 {
        let counter = self
            .counters
            .entry((language.to_string(), name.to_string()))
            .or_insert(0);
        *counter += 1;
        *counter
    }
}

impl<'c, C: CatalogClient> Orchestrator<'c, C> {
    /// Create an orchestrator for `app` on `platform`.
    pub fn new(client: &'c C, app: impl Into<String>, platform: StorePlatform) -> Self {
        Self {
            client,
            app: app.into(),
            platform,
        }
    }

    /// Discover screenshots under `root` and synchronize them.
    pub async fn discover_and_synchronize<P: DimensionProbe>(
        &self,
        root: &Path,
        classifier: &Classifier<'_, P>,
        discovery_options: &DiscoveryOptions,
        options: &SyncOptions,
    ) -> std::result::Result<SyncReport, SyncAborted> {
        let mut report = SyncReport::default();
        if options.skip_screenshots {
            enter(&mut report, SyncPhase::Done);
            return Ok(report);
        }

        enter(&mut report, SyncPhase::Discovering);
        let discovered = match self.client.available_languages().await {
            Ok(languages) => discover(root, &languages, classifier, discovery_options),
            Err(e) => Err(e),
        };
        match discovered {
            Ok(discovery) => self.synchronize(&discovery, options).await,
            Err(source) => Err(abort(report, source)),
        }
    }

    /// Replace the remote screenshots of every discovered language.
    pub async fn synchronize(
        &self,
        discovery: &Discovery,
        options: &SyncOptions,
    ) -> std::result::Result<SyncReport, SyncAborted> {
        let mut report = SyncReport::from_discovery(discovery);

        if options.skip_screenshots || options.edit_live {
            debug!(
                skip = options.skip_screenshots,
                edit_live = options.edit_live,
                "screenshot upload disabled"
            );
            enter(&mut report, SyncPhase::Done);
            return Ok(report);
        }

        match self.run(discovery, options, &mut report).await {
            Ok(()) => {
                enter(&mut report, SyncPhase::Done);
                info!(uploaded = report.total_uploaded(), "Successfully uploaded screenshots");
                Ok(report)
            }
            Err(source) => Err(abort(report, source)),
        }
    }

    async fn run(&self, discovery: &Discovery, options: &SyncOptions, report: &mut SyncReport) -> Result<()> {
        let plan = UploadPlan::new(discovery);

        let mut version = self
            .client
            .fetch_editable_version(&self.app, self.platform)
            .await?
            .ok_or_else(|| ScreenshotError::NoEditableVersion(self.app.clone()))?;

        let mut removed: Vec<(&str, usize)> = Vec::new();
        if options.overwrite {
            enter(report, SyncPhase::Clearing);
            info!("Removing all previously uploaded screenshots");
            for (language, _) in &plan.groups {
                // Inactive languages have nothing to remove
                let Some(slots) = version.screenshots(language) else {
                    debug!(language, "language not active remotely");
                    continue;
                };
                let slots = slots.to_vec();
                for slot in &slots {
                    version.upload_screenshot(None, slot).await?;
                }
                removed.push((*language, slots.len()));
            }
        }

        let languages = plan.languages();
        if languages.is_empty() {
            return Ok(());
        }

        enter(report, SyncPhase::ActivatingLanguages);
        info!(languages = %languages.join(", "), "Activating languages");
        version.activate_languages(&languages);
        let receipt = version.save().await?;
        for (language, count) in removed {
            report.language_mut(language).removed += count;
        }
        let mut version = self.refetch(report, receipt).await?;

        let UploadPlan { groups, mut slots } = plan;
        for (language, shots) in groups {
            enter(report, SyncPhase::Uploading(language.to_string()));
            info!(language, count = shots.len(), "Uploading screenshots");

            let mut submitted = 0;
            for shot in shots {
                let name = shot.formatted_name();
                let index = slots.next(language, &name);
                if index > MAX_SLOTS_PER_DEVICE {
                    let message = format!(
                        "Too many screenshots found for device '{}' in '{}', skipping this one",
                        name, language
                    );
                    error!(path = %shot.file_path().display(), "{}", message);
                    report.language_mut(language).skipped_overflow += 1;
                    report.issues.push(SoftIssue {
                        path: shot.file_path().to_path_buf(),
                        language: language.to_string(),
                        kind: IssueKind::SlotOverflow,
                        message,
                    });
                    continue;
                }

                let slot = RemoteSlot {
                    sort_order: index,
                    language: language.to_string(),
                    device_type: shot.device_type().to_string(),
                    is_secondary_surface: shot.is_secondary_surface(),
                };
                debug!(path = %shot.file_path().display(), sort_order = index, "uploading");
                version.upload_screenshot(Some(shot.file_path()), &slot).await?;
                submitted += 1;
            }

            // Saved per language: larger batches are not applied reliably.
            enter(report, SyncPhase::Saving(language.to_string()));
            let receipt = version.save().await?;
            report.language_mut(language).uploaded += submitted;
            version = self.refetch(report, receipt).await?;
        }

        Ok(())
    }

    async fn refetch(&self, report: &mut SyncReport, receipt: SaveReceipt) -> Result<C::Version> {
        enter(report, SyncPhase::Refetching);
        self.client
            .refetch(&self.app, self.platform, receipt)
            .await?
            .ok_or_else(|| ScreenshotError::NoEditableVersion(self.app.clone()))
    }
}

fn enter(report: &mut SyncReport, phase: SyncPhase) {
    info!(phase = %phase, "screenshot sync phase");
    report.phase = phase;
}

fn abort(mut report: SyncReport, source: ScreenshotError) -> SyncAborted {
    let failed_during = std::mem::replace(&mut report.phase, SyncPhase::Failed);
    warn!(phase = %failed_during, error = %source, "screenshot sync aborted");
    SyncAborted {
        report,
        failed_during,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::DeviceRegistry;
    use crate::probe::FileNameProbe;
    use crate::screen_size::ScreenSize;
    use crate::sync::{CatalogCall, RecordingCatalog};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn shot(path: &str, language: &str, size: ScreenSize, secondary: bool) -> Screenshot {
        Screenshot::new(
            path,
            language,
            size,
            size.device_identifier(),
            secondary,
            DeviceRegistry::builtin(),
        )
        .unwrap()
    }

    fn discovery(screenshots: Vec<Screenshot>) -> Discovery {
        Discovery {
            screenshots,
            skipped: vec![],
        }
    }

    fn remote(order: u32, language: &str) -> RemoteSlot {
        RemoteSlot {
            sort_order: order,
            language: language.to_string(),
            device_type: "iphone65".to_string(),
            is_secondary_surface: false,
        }
    }

    fn position(calls: &[CatalogCall], pred: impl Fn(&CatalogCall) -> bool) -> Option<usize> {
        calls.iter().position(pred)
    }

    fn is_upload(call: &CatalogCall) -> bool {
        matches!(call, CatalogCall::Upload { .. })
    }

    #[tokio::test]
    async fn test_activation_once_before_uploads() {
        let catalog = RecordingCatalog::new();
        let orchestrator = Orchestrator::new(&catalog, "com.example.app", StorePlatform::Ios);
        let input = discovery(vec![
            shot("en-US/a.png", "en-US", ScreenSize::Ios65, false),
            shot("de-DE/a.png", "de-DE", ScreenSize::Ios65, false),
            shot("en-US/b.png", "en-US", ScreenSize::IosIpadPro, false),
        ]);

        let report = orchestrator
            .synchronize(&input, &SyncOptions::default())
            .await
            .unwrap();

        let calls = catalog.calls();
        let activations: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                CatalogCall::Activate { languages } => Some(languages.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(activations, vec![vec!["en-US".to_string(), "de-DE".to_string()]]);

        let activate = position(&calls, |c| matches!(c, CatalogCall::Activate { .. })).unwrap();
        let first_upload = position(&calls, is_upload).unwrap();
        assert!(activate < first_upload);

        assert_eq!(report.phase, SyncPhase::Done);
        assert_eq!(report.languages["en-US"].uploaded, 2);
        assert_eq!(report.languages["de-DE"].uploaded, 1);
    }

    #[tokio::test]
    async fn test_saves_and_refetches_per_language() {
        let catalog = RecordingCatalog::new();
        let orchestrator = Orchestrator::new(&catalog, "app", StorePlatform::Ios);
        let input = discovery(vec![
            shot("en-US/a.png", "en-US", ScreenSize::Ios65, false),
            shot("de-DE/a.png", "de-DE", ScreenSize::Ios65, false),
            shot("fr-FR/a.png", "fr-FR", ScreenSize::Ios65, false),
        ]);

        orchestrator
            .synchronize(&input, &SyncOptions::default())
            .await
            .unwrap();

        let calls = catalog.calls();
        let saves = calls.iter().filter(|c| **c == CatalogCall::Save).count();
        let fetches = calls.iter().filter(|c| **c == CatalogCall::Fetch).count();
        // One activation save plus one per language, each followed by a fetch
        assert_eq!(saves, 4);
        assert_eq!(fetches, 5);

        // Uploads of a language always follow the previous language's save
        let de_upload = position(&calls, |c| {
            matches!(c, CatalogCall::Upload { slot, .. } if slot.language == "de-DE")
        })
        .unwrap();
        assert_eq!(calls[de_upload - 1], CatalogCall::Fetch);
        assert_eq!(calls[de_upload - 2], CatalogCall::Save);
    }

    #[tokio::test]
    async fn test_eleventh_screenshot_is_a_soft_skip() {
        let catalog = RecordingCatalog::new();
        let orchestrator = Orchestrator::new(&catalog, "app", StorePlatform::Ios);
        let shots = (1..=11)
            .map(|i| shot(&format!("en-US/{:02}.png", i), "en-US", ScreenSize::Ios58, false))
            .collect();

        let report = orchestrator
            .synchronize(&discovery(shots), &SyncOptions::default())
            .await
            .unwrap();

        let orders: Vec<u32> = catalog
            .calls()
            .iter()
            .filter_map(|c| match c {
                CatalogCall::Upload { slot, .. } => Some(slot.sort_order),
                _ => None,
            })
            .collect();
        assert_eq!(orders, (1..=10).collect::<Vec<_>>());

        let en = &report.languages["en-US"];
        assert_eq!(en.uploaded, 10);
        assert_eq!(en.skipped_overflow, 1);
        let overflowed: Vec<PathBuf> = report
            .issues
            .iter()
            .filter(|i| i.kind == IssueKind::SlotOverflow)
            .map(|i| i.path.clone())
            .collect();
        assert_eq!(overflowed, vec![PathBuf::from("en-US/11.png")]);
        assert_eq!(report.phase, SyncPhase::Done);
        assert_eq!(catalog.remote_slots("en-US").len(), 10);
    }

    #[tokio::test]
    async fn test_imessage_slots_are_counted_separately() {
        let catalog = RecordingCatalog::new();
        let orchestrator = Orchestrator::new(&catalog, "app", StorePlatform::Ios);
        let mut shots = Vec::new();
        for i in 0..10 {
            shots.push(shot(&format!("en-US/{}.png", i), "en-US", ScreenSize::Ios65, false));
            shots.push(shot(&format!("iMessage/en-US/{}.png", i), "en-US", ScreenSize::Ios65, true));
        }

        let report = orchestrator
            .synchronize(&discovery(shots), &SyncOptions::default())
            .await
            .unwrap();
        assert_eq!(report.languages["en-US"].uploaded, 20);
        assert!(report.issues.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_removes_existing_slots_first() {
        let catalog = RecordingCatalog::new()
            .with_slot(remote(1, "en-US"))
            .with_slot(remote(2, "en-US"))
            .with_slot(remote(1, "fr-FR"));
        let orchestrator = Orchestrator::new(&catalog, "app", StorePlatform::Ios);
        let input = discovery(vec![
            shot("en-US/a.png", "en-US", ScreenSize::Ios65, false),
            shot("ja/a.png", "ja", ScreenSize::Ios65, false),
        ]);
        let options = SyncOptions {
            overwrite: true,
            ..Default::default()
        };

        let report = orchestrator.synchronize(&input, &options).await.unwrap();

        let calls = catalog.calls();
        let removals: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                CatalogCall::Remove { slot } => Some(slot.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(removals, vec![remote(1, "en-US"), remote(2, "en-US")]);

        let last_removal = calls
            .iter()
            .rposition(|c| matches!(c, CatalogCall::Remove { .. }))
            .unwrap();
        assert!(last_removal < position(&calls, is_upload).unwrap());

        assert_eq!(report.languages["en-US"].removed, 2);
        assert_eq!(report.languages["ja"].removed, 0);
        // Languages without discovered screenshots are left alone
        assert_eq!(catalog.remote_slots("fr-FR"), vec![remote(1, "fr-FR")]);
        assert_eq!(catalog.remote_slots("en-US").len(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_of_active_language_without_slots() {
        let catalog = RecordingCatalog::new().with_active_language("de-DE");
        let orchestrator = Orchestrator::new(&catalog, "app", StorePlatform::Ios);
        let input = discovery(vec![shot("de-DE/a.png", "de-DE", ScreenSize::Ios65, false)]);
        let options = SyncOptions {
            overwrite: true,
            ..Default::default()
        };

        let report = orchestrator.synchronize(&input, &options).await.unwrap();

        assert!(!catalog
            .calls()
            .iter()
            .any(|c| matches!(c, CatalogCall::Remove { .. })));
        assert_eq!(report.languages["de-DE"].removed, 0);
        assert_eq!(report.languages["de-DE"].uploaded, 1);
        assert_eq!(catalog.remote_slots("de-DE"), vec![remote(1, "de-DE")]);
    }

    #[tokio::test]
    async fn test_without_overwrite_nothing_is_removed() {
        let catalog = RecordingCatalog::new().with_slot(remote(5, "en-US"));
        let orchestrator = Orchestrator::new(&catalog, "app", StorePlatform::Ios);
        let input = discovery(vec![shot("en-US/a.png", "en-US", ScreenSize::Ios65, false)]);

        orchestrator
            .synchronize(&input, &SyncOptions::default())
            .await
            .unwrap();
        assert!(!catalog
            .calls()
            .iter()
            .any(|c| matches!(c, CatalogCall::Remove { .. })));
        assert_eq!(catalog.remote_slots("en-US").len(), 2);
    }

    #[tokio::test]
    async fn test_abort_keeps_saved_languages() {
        // Save #1 activates, #2 saves en-US, #3 fails on de-DE
        let catalog = RecordingCatalog::new().fail_on_save(3);
        let orchestrator = Orchestrator::new(&catalog, "app", StorePlatform::Ios);
        let input = discovery(vec![
            shot("en-US/a.png", "en-US", ScreenSize::Ios65, false),
            shot("en-US/b.png", "en-US", ScreenSize::Ios65, false),
            shot("de-DE/a.png", "de-DE", ScreenSize::Ios65, false),
        ]);

        let aborted = orchestrator
            .synchronize(&input, &SyncOptions::default())
            .await
            .unwrap_err();

        assert_eq!(aborted.failed_during, SyncPhase::Saving("de-DE".to_string()));
        assert_eq!(aborted.report.phase, SyncPhase::Failed);
        assert_eq!(aborted.report.languages["en-US"].uploaded, 2);
        assert!(aborted
            .report
            .languages
            .get("de-DE")
            .map_or(true, |l| l.uploaded == 0));
        assert!(matches!(aborted.source, ScreenshotError::Remote(_)));
        assert_eq!(catalog.remote_slots("en-US").len(), 2);
        assert!(catalog.remote_slots("de-DE").is_empty());
    }

    #[tokio::test]
    async fn test_missing_editable_version_is_fatal() {
        let catalog = RecordingCatalog::new().without_version();
        let orchestrator = Orchestrator::new(&catalog, "com.example.app", StorePlatform::Ios);
        let input = discovery(vec![shot("en-US/a.png", "en-US", ScreenSize::Ios65, false)]);

        let aborted = orchestrator
            .synchronize(&input, &SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            aborted.source,
            ScreenshotError::NoEditableVersion(ref app) if app == "com.example.app"
        ));
        assert_eq!(aborted.failed_during, SyncPhase::Idle);
        assert_eq!(catalog.calls(), vec![CatalogCall::Fetch]);
    }

    #[tokio::test]
    async fn test_skip_and_edit_live_are_no_ops() {
        let catalog = RecordingCatalog::new();
        let orchestrator = Orchestrator::new(&catalog, "app", StorePlatform::Ios);
        let input = discovery(vec![shot("en-US/a.png", "en-US", ScreenSize::Ios65, false)]);

        for options in [
            SyncOptions {
                skip_screenshots: true,
                ..Default::default()
            },
            SyncOptions {
                edit_live: true,
                ..Default::default()
            },
        ] {
            let report = orchestrator.synchronize(&input, &options).await.unwrap();
            assert_eq!(report.phase, SyncPhase::Done);
            assert!(!report.has_changes());
        }
        assert!(catalog.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_discovery_makes_no_changes() {
        let catalog = RecordingCatalog::new();
        let orchestrator = Orchestrator::new(&catalog, "app", StorePlatform::Ios);

        let report = orchestrator
            .synchronize(&Discovery::default(), &SyncOptions::default())
            .await
            .unwrap();
        assert_eq!(report.phase, SyncPhase::Done);
        assert_eq!(catalog.calls(), vec![CatalogCall::Fetch]);
    }

    #[tokio::test]
    async fn test_discover_and_synchronize() {
        let temp = TempDir::new().unwrap();
        for relative in [
            "en-US/home{1242x2688}.png",
            "en-US/xr{828x1792}.png",
            "iMessage/en-US/sticker{1242x2688}.png",
        ] {
            let path = temp.path().join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"").unwrap();
        }

        let catalog = RecordingCatalog::new().with_languages(["en-US"]);
        let orchestrator = Orchestrator::new(&catalog, "app", StorePlatform::Ios);
        let classifier = Classifier::new(DeviceRegistry::builtin(), FileNameProbe);

        let report = orchestrator
            .discover_and_synchronize(
                temp.path(),
                &classifier,
                &DiscoveryOptions::default(),
                &SyncOptions::default(),
            )
            .await
            .unwrap();
        let en = &report.languages["en-US"];
        assert_eq!(en.uploaded, 2);
        assert_eq!(en.skipped_unsupported, 1);
    }

    #[tokio::test]
    async fn test_discovery_failure_aborts_while_discovering() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("xx/a{1242x2688}.png");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"").unwrap();

        let catalog = RecordingCatalog::new();
        let orchestrator = Orchestrator::new(&catalog, "app", StorePlatform::Ios);
        let classifier = Classifier::new(DeviceRegistry::builtin(), FileNameProbe);

        let aborted = orchestrator
            .discover_and_synchronize(
                temp.path(),
                &classifier,
                &DiscoveryOptions::default(),
                &SyncOptions::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(aborted.failed_during, SyncPhase::Discovering);
        assert!(matches!(aborted.source, ScreenshotError::InvalidLanguageFolders { .. }));
        assert!(catalog.calls().is_empty());
    }
}
