//! Canonical screen-size categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::devices::DeviceRegistry;
use crate::ScreenshotError;

/// Resolutions of the iPhone XR, which the remote catalog does not list as a device.
pub const IPHONE_61_DIMS: &[(u32, u32)] = &[(828, 1792), (1792, 828)];

/// Device identifier used for the iPhone XR override.
pub const IPHONE_61_IDENTIFIER: &str = "iphone61";

/// Canonical screen-size identity, independent of device identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScreenSize {
    /// iPhone 4
    #[serde(rename = "iOS-3.5-in")]
    Ios35,
    /// iPhone 5
    #[serde(rename = "iOS-4-in")]
    Ios40,
    /// iPhone 6, 7 and 8
    #[serde(rename = "iOS-4.7-in")]
    Ios47,
    /// iPhone 6 Plus, 7 Plus and 8 Plus
    #[serde(rename = "iOS-5.5-in")]
    Ios55,
    /// iPhone XS
    #[serde(rename = "iOS-5.8-in")]
    Ios58,
    /// iPhone XR
    #[serde(rename = "iOS-6.1-in")]
    Ios61,
    /// iPhone XS Max
    #[serde(rename = "iOS-6.5-in")]
    Ios65,
    /// iPad
    #[serde(rename = "iOS-iPad")]
    IosIpad,
    /// iPad 10.5
    #[serde(rename = "iOS-iPad-10.5")]
    IosIpad105,
    /// iPad 11
    #[serde(rename = "iOS-iPad-11")]
    IosIpad11,
    /// iPad Pro
    #[serde(rename = "iOS-iPad-Pro")]
    IosIpadPro,
    /// Apple Watch
    #[serde(rename = "iOS-Apple-Watch")]
    IosAppleWatch,
    /// Apple Watch Series 4
    #[serde(rename = "iOS-Apple-Watch-Series4")]
    IosAppleWatchSeries4,
    /// Apple TV
    #[serde(rename = "Apple-TV")]
    AppleTv,
    /// Mac
    #[serde(rename = "Mac")]
    Mac,
}

/// Lookup order for dimension matching.
const LOOKUP_ORDER: &[ScreenSize] = &[
    ScreenSize::Ios65,
    ScreenSize::Ios61,
    ScreenSize::Ios58,
    ScreenSize::Ios55,
    ScreenSize::Ios47,
    ScreenSize::Ios40,
    ScreenSize::Ios35,
    ScreenSize::IosIpad,
    ScreenSize::IosIpad105,
    ScreenSize::IosIpad11,
    ScreenSize::IosIpadPro,
    ScreenSize::Mac,
    ScreenSize::IosAppleWatch,
    ScreenSize::IosAppleWatchSeries4,
    ScreenSize::AppleTv,
];

impl ScreenSize {
    /// All categories, in dimension lookup order.
    pub fn all() -> &'static [ScreenSize] {
        LOOKUP_ORDER
    }

    /// Canonical string, e.g. `iOS-6.5-in`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenSize::Ios35 => "iOS-3.5-in",
            ScreenSize::Ios40 => "iOS-4-in",
            ScreenSize::Ios47 => "iOS-4.7-in",
            ScreenSize::Ios55 => "iOS-5.5-in",
            ScreenSize::Ios58 => "iOS-5.8-in",
            ScreenSize::Ios61 => "iOS-6.1-in",
            ScreenSize::Ios65 => "iOS-6.5-in",
            ScreenSize::IosIpad => "iOS-iPad",
            ScreenSize::IosIpad105 => "iOS-iPad-10.5",
            ScreenSize::IosIpad11 => "iOS-iPad-11",
            ScreenSize::IosIpadPro => "iOS-iPad-Pro",
            ScreenSize::IosAppleWatch => "iOS-Apple-Watch",
            ScreenSize::IosAppleWatchSeries4 => "iOS-Apple-Watch-Series4",
            ScreenSize::AppleTv => "Apple-TV",
            ScreenSize::Mac => "Mac",
        }
    }

    /// Human label used for slot bookkeeping.
    ///
    /// The iPad Pro 12.9" (3rd generation) has no label of its own: it shares
    /// the iPad Pro resolution and would otherwise collide with it.
    pub fn display_name(&self) -> &'static str {
        match self {
            ScreenSize::Ios35 => "iPhone 4",
            ScreenSize::Ios40 => "iPhone 5",
            ScreenSize::Ios47 => "iPhone 6",
            ScreenSize::Ios55 => "iPhone 6 Plus",
            ScreenSize::Ios58 => "iPhone XS",
            ScreenSize::Ios61 => "iPhone XR",
            ScreenSize::Ios65 => "iPhone XS Max",
            ScreenSize::IosIpad => "iPad",
            ScreenSize::IosIpad105 => "iPad 10.5",
            ScreenSize::IosIpad11 => "iPad 11",
            ScreenSize::IosIpadPro => "iPad Pro",
            ScreenSize::Mac => "Mac",
            ScreenSize::IosAppleWatch => "Watch",
            ScreenSize::IosAppleWatchSeries4 => "Watch Series4",
            ScreenSize::AppleTv => "Apple TV",
        }
    }

    /// Device identifier backing this category.
    pub fn device_identifier(&self) -> &'static str {
        match self {
            ScreenSize::Ios35 => "iphone35",
            ScreenSize::Ios40 => "iphone4",
            ScreenSize::Ios47 => "iphone6",
            ScreenSize::Ios55 => "iphone6Plus",
            ScreenSize::Ios58 => "iphone58",
            ScreenSize::Ios61 => IPHONE_61_IDENTIFIER,
            ScreenSize::Ios65 => "iphone65",
            ScreenSize::IosIpad => "ipad",
            ScreenSize::IosIpad105 => "ipad105",
            ScreenSize::IosIpad11 => "ipadPro11",
            ScreenSize::IosIpadPro => "ipadPro",
            ScreenSize::Mac => "desktop",
            ScreenSize::IosAppleWatch => "watch",
            ScreenSize::IosAppleWatchSeries4 => "watchSeries4",
            ScreenSize::AppleTv => "appleTV",
        }
    }

    /// Category for a device identifier, including legacy aliases.
    pub fn for_device_identifier(identifier: &str) -> Option<ScreenSize> {
        if identifier == "ipadPro129" {
            return Some(ScreenSize::IosIpadPro);
        }
        LOOKUP_ORDER
            .iter()
            .copied()
            .find(|size| size.device_identifier() == identifier)
    }

    /// Whether this category's resolutions are a fixed override rather than registry data.
    pub fn is_override(&self) -> bool {
        matches!(self, ScreenSize::Ios61)
    }

    /// Ordered `(category, resolutions)` entries used for dimension lookup.
    ///
    /// Categories whose device is missing from `registry` are left out, except
    /// for the iPhone XR override which is always present.
    pub fn resolution_map(registry: &DeviceRegistry) -> Vec<(ScreenSize, Vec<(u32, u32)>)> {
        LOOKUP_ORDER
            .iter()
            .filter_map(|&size| {
                if size.is_override() {
                    return Some((size, IPHONE_61_DIMS.to_vec()));
                }
                registry
                    .get(size.device_identifier())
                    .map(|profile| (size, profile.accepted_resolutions.clone()))
            })
            .collect()
    }

    /// First category whose resolutions list `(width, height)`, or failing
    /// that `(height, width)`.
    ///
    /// A listed orientation always wins over a swapped match.
    pub fn for_dimensions(registry: &DeviceRegistry, width: u32, height: u32) -> Option<ScreenSize> {
        let map = Self::resolution_map(registry);
        let find = |pair: (u32, u32)| {
            map.iter()
                .find(|(_, resolutions)| resolutions.contains(&pair))
                .map(|(size, _)| *size)
        };
        find((width, height)).or_else(|| find((height, width)))
    }
}

impl fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScreenSize {
    type Err = ScreenshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LOOKUP_ORDER
            .iter()
            .copied()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| ScreenshotError::UnknownDeviceType(s.to_string()))
    }
}
