//! Device profiles the remote catalog accepts screenshots for.
//!
//! The registry is reference data: it is built once (either from the
//! built-in table or from a `deviceTypes.json` style file) and only read
//! afterwards, so a single instance can be shared by the classifier and
//! the orchestrator without synchronization.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, ScreenshotError};

// =============================================================================
// Built-in Resolution Tables
// =============================================================================

/// iPhone 3.5" (iPhone 4S), with and without status bar
pub const IPHONE_35_DIMS: &[(u32, u32)] = &[(640, 960), (960, 640), (640, 920), (960, 600)];

/// iPhone 4" (iPhone 5, SE), with and without status bar
pub const IPHONE_40_DIMS: &[(u32, u32)] = &[(640, 1136), (1136, 640), (640, 1096), (1136, 600)];

/// iPhone 4.7" (iPhone 6, 7, 8)
pub const IPHONE_47_DIMS: &[(u32, u32)] = &[(750, 1334), (1334, 750)];

/// iPhone 5.5" (iPhone 6 Plus, 7 Plus, 8 Plus)
pub const IPHONE_55_DIMS: &[(u32, u32)] = &[(1242, 2208), (2208, 1242)];

/// iPhone 5.8" (iPhone X, XS)
pub const IPHONE_58_DIMS: &[(u32, u32)] = &[(1125, 2436), (2436, 1125)];

/// iPhone 6.5" (iPhone XS Max)
pub const IPHONE_65_DIMS: &[(u32, u32)] = &[(1242, 2688), (2688, 1242)];

/// iPad 9.7", retina and non-retina, with and without status bar
pub const IPAD_DIMS: &[(u32, u32)] = &[
    (1536, 2048),
    (2048, 1536),
    (1536, 2008),
    (2048, 1496),
    (768, 1024),
    (1024, 768),
    (768, 1004),
    (1024, 748),
];

/// iPad 10.5"
pub const IPAD_105_DIMS: &[(u32, u32)] = &[(1668, 2224), (2224, 1668)];

/// iPad Pro 11"
pub const IPAD_PRO_11_DIMS: &[(u32, u32)] = &[(1668, 2388), (2388, 1668)];

/// iPad Pro 12.9" (all generations share the resolution)
pub const IPAD_PRO_129_DIMS: &[(u32, u32)] = &[(2048, 2732), (2732, 2048)];

/// Mac, 16:10 landscape only
pub const DESKTOP_DIMS: &[(u32, u32)] = &[(1280, 800), (1440, 900), (2560, 1600), (2880, 1800)];

/// Apple Watch Series 3
pub const WATCH_DIMS: &[(u32, u32)] = &[(312, 390)];

/// Apple Watch Series 4
pub const WATCH_SERIES4_DIMS: &[(u32, u32)] = &[(368, 448)];

/// Apple TV, landscape only
pub const APPLE_TV_DIMS: &[(u32, u32)] = &[(1920, 1080), (3840, 2160)];

struct BuiltinProfile {
    identifier: &'static str,
    name: &'static str,
    category: DeviceCategory,
    resolutions: &'static [(u32, u32)],
    imessage: bool,
}

const BUILTIN_PROFILES: &[BuiltinProfile] = &[
    BuiltinProfile {
        identifier: "iphone35",
        name: "iPhone 3.5-Inch Display",
        category: DeviceCategory::Phone,
        resolutions: IPHONE_35_DIMS,
        imessage: true,
    },
    BuiltinProfile {
        identifier: "iphone4",
        name: "iPhone 4-Inch Display",
        category: DeviceCategory::Phone,
        resolutions: IPHONE_40_DIMS,
        imessage: true,
    },
    BuiltinProfile {
        identifier: "iphone6",
        name: "iPhone 4.7-Inch Display",
        category: DeviceCategory::Phone,
        resolutions: IPHONE_47_DIMS,
        imessage: true,
    },
    BuiltinProfile {
        identifier: "iphone6Plus",
        name: "iPhone 5.5-Inch Display",
        category: DeviceCategory::Phone,
        resolutions: IPHONE_55_DIMS,
        imessage: true,
    },
    BuiltinProfile {
        identifier: "iphone58",
        name: "iPhone 5.8-Inch Display",
        category: DeviceCategory::Phone,
        resolutions: IPHONE_58_DIMS,
        imessage: true,
    },
    BuiltinProfile {
        identifier: "iphone65",
        name: "iPhone 6.5-Inch Display",
        category: DeviceCategory::Phone,
        resolutions: IPHONE_65_DIMS,
        imessage: true,
    },
    BuiltinProfile {
        identifier: "ipad",
        name: "iPad 9.7-Inch Display",
        category: DeviceCategory::Tablet,
        resolutions: IPAD_DIMS,
        imessage: true,
    },
    BuiltinProfile {
        identifier: "ipad105",
        name: "iPad 10.5-Inch Display",
        category: DeviceCategory::Tablet,
        resolutions: IPAD_105_DIMS,
        imessage: true,
    },
    BuiltinProfile {
        identifier: "ipadPro",
        name: "iPad Pro 12.9-Inch Display",
        category: DeviceCategory::Tablet,
        resolutions: IPAD_PRO_129_DIMS,
        imessage: true,
    },
    BuiltinProfile {
        identifier: "ipadPro11",
        name: "iPad Pro 11-Inch Display",
        category: DeviceCategory::Tablet,
        resolutions: IPAD_PRO_11_DIMS,
        imessage: true,
    },
    BuiltinProfile {
        identifier: "ipadPro129",
        name: "iPad Pro (3rd Gen) 12.9-Inch Display",
        category: DeviceCategory::Tablet,
        resolutions: IPAD_PRO_129_DIMS,
        imessage: true,
    },
    BuiltinProfile {
        identifier: "watch",
        name: "Apple Watch Series 3",
        category: DeviceCategory::Watch,
        resolutions: WATCH_DIMS,
        imessage: false,
    },
    BuiltinProfile {
        identifier: "watchSeries4",
        name: "Apple Watch Series 4",
        category: DeviceCategory::Watch,
        resolutions: WATCH_SERIES4_DIMS,
        imessage: false,
    },
    BuiltinProfile {
        identifier: "appleTV",
        name: "Apple TV",
        category: DeviceCategory::Tv,
        resolutions: APPLE_TV_DIMS,
        imessage: false,
    },
    BuiltinProfile {
        identifier: "desktop",
        name: "Mac",
        category: DeviceCategory::Desktop,
        resolutions: DESKTOP_DIMS,
        imessage: false,
    },
];

// =============================================================================
// Types
// =============================================================================

/// Coarse device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCategory {
    /// iPhone
    #[serde(alias = "iphone")]
    Phone,
    /// iPad
    #[serde(alias = "ipad")]
    Tablet,
    /// Apple Watch
    Watch,
    /// Apple TV
    #[serde(alias = "appleTV", alias = "appletv")]
    Tv,
    /// Mac
    #[serde(alias = "mac")]
    Desktop,
}

impl std::fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeviceCategory::Phone => "phone",
            DeviceCategory::Tablet => "tablet",
            DeviceCategory::Watch => "watch",
            DeviceCategory::Tv => "tv",
            DeviceCategory::Desktop => "desktop",
        };
        write!(f, "{}", name)
    }
}

/// A device the remote catalog accepts screenshots for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Stable key, e.g. `iphone65`.
    pub identifier: String,
    /// Human label.
    #[serde(alias = "name")]
    pub display_name: String,
    /// Coarse device class.
    pub category: DeviceCategory,
    /// Accepted `(width, height)` pairs; both orientations are listed when both are valid.
    #[serde(alias = "screenshot_resolutions", alias = "screenshotResolutions")]
    pub accepted_resolutions: Vec<(u32, u32)>,
    /// Whether iMessage screenshots can be uploaded for this device.
    #[serde(
        default,
        alias = "supports_imessage_screenshots",
        alias = "supportsImessageScreenshots"
    )]
    pub supports_secondary_surface: bool,
}

impl DeviceProfile {
    /// Returns true if `(width, height)` is an accepted pair, as listed.
    pub fn accepts(&self, width: u32, height: u32) -> bool {
        self.accepted_resolutions.contains(&(width, height))
    }
}

/// Immutable registry of device profiles keyed by identifier.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    profiles: Vec<DeviceProfile>,
    index: HashMap<String, usize>,
}

impl DeviceRegistry {
    /// The built-in device table, constructed on first access.
    pub fn builtin() -> &'static DeviceRegistry {
        static REGISTRY: OnceLock<DeviceRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            let profiles = BUILTIN_PROFILES
                .iter()
                .map(|p| DeviceProfile {
                    identifier: p.identifier.to_string(),
                    display_name: p.name.to_string(),
                    category: p.category,
                    accepted_resolutions: p.resolutions.to_vec(),
                    supports_secondary_surface: p.imessage,
                })
                .collect();
            Self::indexed(profiles)
        })
    }

    /// Build a registry, rejecting duplicate identifiers.
    pub fn from_profiles(profiles: Vec<DeviceProfile>) -> Result<Self> {
        let mut seen = HashMap::new();
        for profile in &profiles {
            if profile.identifier.trim().is_empty() {
                return Err(ScreenshotError::InvalidRegistry(
                    "device identifier cannot be empty".to_string(),
                ));
            }
            if seen.insert(profile.identifier.as_str(), ()).is_some() {
                return Err(ScreenshotError::InvalidRegistry(format!(
                    "duplicate device identifier '{}'",
                    profile.identifier
                )));
            }
        }
        Ok(Self::indexed(profiles))
    }

    /// Load a registry from a JSON array of profiles.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading device registry");
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse a registry from a JSON array of profiles.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let profiles: Vec<DeviceProfile> = serde_json::from_str(content)?;
        Self::from_profiles(profiles)
    }

    fn indexed(profiles: Vec<DeviceProfile>) -> Self {
        let index = profiles
            .iter()
            .enumerate()
            .map(|(i, p)| (p.identifier.clone(), i))
            .collect();
        Self { profiles, index }
    }

    /// Look up a profile by identifier.
    pub fn get(&self, identifier: &str) -> Option<&DeviceProfile> {
        self.index.get(identifier).map(|&i| &self.profiles[i])
    }

    /// Returns true if the identifier is an accepted device.
    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    /// All identifiers, in table order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|p| p.identifier.as_str())
    }

    /// All profiles, in table order.
    pub fn profiles(&self) -> &[DeviceProfile] {
        &self.profiles
    }

    /// Resolution pairs listed by more than one profile, with the profiles listing them.
    pub fn shared_resolutions(&self) -> Vec<((u32, u32), Vec<&str>)> {
        let mut owners: Vec<((u32, u32), Vec<&str>)> = Vec::new();
        for profile in &self.profiles {
            for &pair in &profile.accepted_resolutions {
                match owners.iter_mut().find(|(p, _)| *p == pair) {
                    Some((_, ids)) => ids.push(profile.identifier.as_str()),
                    None => owners.push((pair, vec![profile.identifier.as_str()])),
                }
            }
        }
        owners.retain(|(_, ids)| ids.len() > 1);
        owners
    }
}
