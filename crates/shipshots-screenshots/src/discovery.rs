//! Collect screenshots from a language-per-folder directory tree.
//!
//! ```text
//! screenshots/
//! ├── en-US/
//! │   ├── 1_iphone65{1242x2688}.png
//! │   └── ipadPro129/            # device folder, bypasses dimension lookup
//! │       └── 1.png
//! ├── de-DE/
//! ├── appleTV/                   # reserved: nested language folders
//! │   └── en-US/
//! └── iMessage/                  # reserved: nested language folders, iMessage surface
//!     └── en-US/
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::classify::Classifier;
use crate::probe::DimensionProbe;
use crate::screenshot::{has_allowed_extension, Screenshot};
use crate::{Result, ScreenshotError};

/// Reserved folder holding Apple TV language folders.
pub const APPLE_TV_DIR_NAME: &str = "appleTV";

/// Reserved folder holding iMessage language folders.
pub const IMESSAGE_DIR_NAME: &str = "iMessage";

/// Options for [`discover`].
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Skip the up-front check that every folder is a language or reserved name.
    pub ignore_language_directory_validation: bool,
}

/// Why a discovered file was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Framed screenshots exist in the same folder and this one is not framed.
    Unframed,
    /// The device is not accepted by the remote catalog.
    UnacceptedDevice,
}

/// A file left out of the discovered set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedScreenshot {
    pub path: PathBuf,
    pub language: String,
    pub reason: SkipReason,
}

/// Result of walking a screenshot tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Discovery {
    /// Screenshots in discovery order.
    pub screenshots: Vec<Screenshot>,
    /// Files dropped with a warning.
    pub skipped: Vec<SkippedScreenshot>,
}

impl Discovery {
    /// Languages with at least one screenshot, in first-appearance order.
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = Vec::new();
        for shot in &self.screenshots {
            if !languages.contains(&shot.language()) {
                languages.push(shot.language());
            }
        }
        languages
    }
}

/// Walk `root` and classify every screenshot under it.
///
/// Language folder names are matched case-insensitively against
/// `available_languages`; the canonical spelling from that list is what the
/// screenshots carry.
pub fn discover<P: DimensionProbe>(
    root: &Path,
    available_languages: &[String],
    classifier: &Classifier<'_, P>,
    options: &DiscoveryOptions,
) -> Result<Discovery> {
    if !root.is_dir() {
        return Err(ScreenshotError::DirectoryNotFound(root.to_path_buf()));
    }

    let languages: HashMap<String, &str> = available_languages
        .iter()
        .map(|l| (l.to_lowercase(), l.as_str()))
        .collect();

    let walker = Walker {
        languages: &languages,
        classifier,
        options,
    };

    let mut discovery = Discovery::default();
    walker.collect(root, false, &mut discovery)?;

    let registry = classifier.registry();
    let mut announced = false;
    let skipped = &mut discovery.skipped;
    discovery.screenshots.retain(|shot| {
        if registry.contains(shot.device_type()) {
            return true;
        }
        if !announced {
            warn!("Unaccepted device screenshots detected, these files will be skipped");
            announced = true;
        }
        warn!(
            path = %shot.file_path().display(),
            device = shot.device_type(),
            "Skipping screenshot: not an accepted device"
        );
        skipped.push(SkippedScreenshot {
            path: shot.file_path().to_path_buf(),
            language: shot.language().to_string(),
            reason: SkipReason::UnacceptedDevice,
        });
        false
    });

    info!(
        root = %root.display(),
        screenshots = discovery.screenshots.len(),
        skipped = discovery.skipped.len(),
        "discovered screenshots"
    );
    Ok(discovery)
}

struct Walker<'a, 'r, P> {
    languages: &'a HashMap<String, &'a str>,
    classifier: &'a Classifier<'r, P>,
    options: &'a DiscoveryOptions,
}

impl<P: DimensionProbe> Walker<'_, '_, P> {
    fn collect(&self, root: &Path, is_secondary: bool, out: &mut Discovery) -> Result<()> {
        let folders = language_folders(root)?;

        if !self.options.ignore_language_directory_validation {
            let invalid: Vec<String> = folders
                .iter()
                .filter_map(|f| folder_name(f))
                .filter(|name| !is_reserved(name) && !self.languages.contains_key(&name.to_lowercase()))
                .map(str::to_string)
                .collect();
            if !invalid.is_empty() {
                return Err(ScreenshotError::InvalidLanguageFolders {
                    root: root.to_path_buf(),
                    names: invalid,
                });
            }
        }

        for folder in folders {
            let Some(name) = folder_name(&folder) else {
                continue;
            };

            if is_reserved(name) {
                debug!(folder = %folder.display(), "descending into reserved folder");
                self.collect(&folder, name == IMESSAGE_DIR_NAME, out)?;
                continue;
            }

            let files = self.screenshot_files(&folder)?;
            if files.is_empty() {
                debug!(folder = %folder.display(), "no screenshots in folder");
                continue;
            }

            let framed_found = files.iter().any(|f| is_framed(f));
            if framed_found {
                warn!(
                    folder = %folder.display(),
                    "Framed screenshots detected, non-framed files may be skipped"
                );
            }

            let language = self
                .languages
                .get(&name.to_lowercase())
                .copied()
                .ok_or_else(|| ScreenshotError::UnknownLanguage {
                    language: name.to_string(),
                    path: folder.clone(),
                })?;

            for file in files {
                if framed_found && !is_framed(&file) && !is_watch(&folder, &file) {
                    warn!(path = %file.display(), "Skipping non-framed screenshot");
                    out.skipped.push(SkippedScreenshot {
                        path: file,
                        language: language.to_string(),
                        reason: SkipReason::Unframed,
                    });
                    continue;
                }

                let shot = self
                    .classifier
                    .classify_with_surface(&file, None, language, is_secondary)?;
                out.screenshots.push(shot);
            }
        }
        Ok(())
    }

    /// Images directly in `folder`, then images in its device-named subfolders.
    fn screenshot_files(&self, folder: &Path) -> Result<Vec<PathBuf>> {
        let registry = self.classifier.registry();
        let mut files = image_files(folder)?;
        for sub in subdirectories(folder)? {
            if folder_name(&sub).is_some_and(|n| registry.contains(n)) {
                files.extend(image_files(&sub)?);
            }
        }
        Ok(files)
    }
}

fn is_reserved(name: &str) -> bool {
    name == APPLE_TV_DIR_NAME || name == IMESSAGE_DIR_NAME
}

fn is_framed(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase().contains("_framed."))
        .unwrap_or(false)
}

/// Looks only below the language folder so a root like `stopwatch-app/` does not count.
fn is_watch(language_folder: &Path, path: &Path) -> bool {
    path.strip_prefix(language_folder)
        .unwrap_or(path)
        .to_string_lossy()
        .to_lowercase()
        .contains("watch")
}

fn folder_name(path: &Path) -> Option<&str> {
    path.file_name()?.to_str()
}

fn is_hidden(path: &Path) -> bool {
    folder_name(path).is_some_and(|n| n.starts_with('.'))
}

fn entries(dir: &Path, dirs: bool) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() == dirs {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(entries(dir, true)?.into_iter().filter(|p| !is_hidden(p)).collect())
}

fn language_folders(root: &Path) -> Result<Vec<PathBuf>> {
    subdirectories(root)
}

fn image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(entries(dir, false)?
        .into_iter()
        .filter(|p| has_allowed_extension(p))
        .collect())
}
