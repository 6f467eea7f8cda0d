//! Progress and outcome of a synchronization run.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::discovery::{Discovery, SkipReason};

/// Phase of a synchronization run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", content = "language", rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Discovering,
    Clearing,
    ActivatingLanguages,
    Uploading(String),
    Saving(String),
    Refetching,
    Done,
    Failed,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPhase::Idle => write!(f, "idle"),
            SyncPhase::Discovering => write!(f, "discovering"),
            SyncPhase::Clearing => write!(f, "clearing"),
            SyncPhase::ActivatingLanguages => write!(f, "activating languages"),
            SyncPhase::Uploading(language) => write!(f, "uploading {}", language),
            SyncPhase::Saving(language) => write!(f, "saving {}", language),
            SyncPhase::Refetching => write!(f, "refetching"),
            SyncPhase::Done => write!(f, "done"),
            SyncPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Kind of a recorded soft failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// More than the allowed number of screenshots for one device and language.
    SlotOverflow,
    /// The device is not accepted by the remote catalog.
    UnacceptedDevice,
    /// Dropped in favour of framed screenshots in the same folder.
    Unframed,
}

/// A per-file problem that did not abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoftIssue {
    pub path: PathBuf,
    pub language: String,
    pub kind: IssueKind,
    pub message: String,
}

/// Counts for one language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LanguageReport {
    /// Screenshots uploaded and saved.
    pub uploaded: usize,
    /// Remote screenshots removed before uploading.
    pub removed: usize,
    /// Screenshots over the per-device limit.
    pub skipped_overflow: usize,
    /// Screenshots for devices the catalog does not accept.
    pub skipped_unsupported: usize,
    /// Unframed screenshots dropped next to framed ones.
    pub skipped_unframed: usize,
}

/// Outcome of a synchronization run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub languages: BTreeMap<String, LanguageReport>,
    pub issues: Vec<SoftIssue>,
    pub phase: SyncPhase,
}

impl SyncReport {
    /// Start a report carrying the files discovery already dropped.
    pub fn from_discovery(discovery: &Discovery) -> Self {
        let mut report = Self::default();
        for skipped in &discovery.skipped {
            let entry = report.language_mut(&skipped.language);
            let (kind, message) = match skipped.reason {
                SkipReason::Unframed => {
                    entry.skipped_unframed += 1;
                    (IssueKind::Unframed, "skipped, framed screenshots exist in the same folder")
                }
                SkipReason::UnacceptedDevice => {
                    entry.skipped_unsupported += 1;
                    (IssueKind::UnacceptedDevice, "skipped, not an accepted device")
                }
            };
            report.issues.push(SoftIssue {
                path: skipped.path.clone(),
                language: skipped.language.clone(),
                kind,
                message: message.to_string(),
            });
        }
        report
    }

    /// Counts for `language`, created on first use.
    pub fn language_mut(&mut self, language: &str) -> &mut LanguageReport {
        self.languages.entry(language.to_string()).or_default()
    }

    /// Total screenshots uploaded across languages.
    pub fn total_uploaded(&self) -> usize {
        self.languages.values().map(|l| l.uploaded).sum()
    }

    /// Total remote screenshots removed across languages.
    pub fn total_removed(&self) -> usize {
        self.languages.values().map(|l| l.removed).sum()
    }

    /// Returns true if any remote change was made.
    pub fn has_changes(&self) -> bool {
        self.total_uploaded() > 0 || self.total_removed() > 0
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_changes() && self.issues.is_empty() {
            return write!(f, "No screenshots changed");
        }

        let mut parts = Vec::new();

        let uploaded = self.total_uploaded();
        if uploaded > 0 {
            parts.push(format!(
                "{} screenshot(s) uploaded in {} language(s)",
                uploaded,
                self.languages.values().filter(|l| l.uploaded > 0).count()
            ));
        }

        let removed = self.total_removed();
        if removed > 0 {
            parts.push(format!("{} screenshot(s) removed", removed));
        }

        if !self.issues.is_empty() {
            parts.push(format!("{} skipped", self.issues.len()));
        }

        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::SkippedScreenshot;

    #[test]
    fn test_from_discovery_counts_skips() {
        let discovery = Discovery {
            screenshots: vec![],
            skipped: vec![
                SkippedScreenshot {
                    path: PathBuf::from("en-US/a.png"),
                    language: "en-US".to_string(),
                    reason: SkipReason::Unframed,
                },
                SkippedScreenshot {
                    path: PathBuf::from("en-US/xr.png"),
                    language: "en-US".to_string(),
                    reason: SkipReason::UnacceptedDevice,
                },
            ],
        };
        let report = SyncReport::from_discovery(&discovery);
        let en = &report.languages["en-US"];
        assert_eq!(en.skipped_unframed, 1);
        assert_eq!(en.skipped_unsupported, 1);
        assert_eq!(report.issues[1].kind, IssueKind::UnacceptedDevice);
        assert_eq!(report.to_string(), "2 skipped");
    }

    #[test]
    fn test_display() {
        let mut report = SyncReport::default();
        assert_eq!(report.to_string(), "No screenshots changed");

        report.language_mut("en-US").uploaded = 3;
        report.language_mut("de-DE").uploaded = 2;
        report.language_mut("de-DE").removed = 4;
        assert_eq!(
            report.to_string(),
            "5 screenshot(s) uploaded in 2 language(s), 4 screenshot(s) removed"
        );
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&SyncPhase::Uploading("en-US".to_string())).unwrap();
        assert_eq!(json, r#"{"phase":"uploading","language":"en-US"}"#);
        assert_eq!(serde_json::to_string(&SyncPhase::Done).unwrap(), r#"{"phase":"done"}"#);
    }
}
