//! Bundle manifest types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Platforms a bundle can declare in `CFBundleSupportedPlatforms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Ipad,
    Iphone,
    Mac,
    Tv,
    Watch,
}

impl Platform {
    /// Parse a manifest platform identifier. Unknown identifiers yield `None`.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Some(match identifier {
            "iPadOS" => Self::Ipad,
            "iPhoneOS" => Self::Iphone,
            "MacOSX" => Self::Mac,
            "TVOS" => Self::Tv,
            "WatchOS" => Self::Watch,
            _ => return None,
        })
    }

    /// The manifest identifier of this platform.
    pub fn identifier(self) -> &'static str {
        match self {
            Self::Ipad => "iPadOS",
            Self::Iphone => "iPhoneOS",
            Self::Mac => "MacOSX",
            Self::Tv => "TVOS",
            Self::Watch => "WatchOS",
        }
    }
}

/// A single icon declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BundleIcon {
    #[serde(rename = "CFBundleIconFiles", default)]
    pub icon_files: Option<Vec<String>>,
    #[serde(rename = "CFBundleIconName", default)]
    pub icon_name: Option<String>,
}

/// The `CFBundleIcons` dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BundleIcons {
    #[serde(rename = "CFBundlePrimaryIcon", default)]
    pub primary_icon: Option<BundleIcon>,
    #[serde(rename = "CFBundleAlternateIcons", default)]
    pub alternate_icons: Option<BTreeMap<String, BundleIcon>>,
}

/// Parsed `Info.plist` of an application or extension bundle.
///
/// Only identifier, name, the two version strings and the supported
/// platforms are required; everything else is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoPlist {
    #[serde(rename = "CFBundleIdentifier")]
    pub identifier: String,
    #[serde(rename = "CFBundleName")]
    pub name: String,
    #[serde(rename = "CFBundleDisplayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "CFBundleShortVersionString")]
    pub short_version: String,
    #[serde(rename = "CFBundleVersion")]
    pub version: String,
    #[serde(rename = "CFBundleSupportedPlatforms")]
    pub supported_platforms: Vec<String>,
    #[serde(rename = "CFBundleExecutable", default)]
    pub executable: Option<String>,
    #[serde(rename = "MinimumOSVersion", default)]
    pub minimum_os_version: Option<String>,
    #[serde(rename = "CFBundleDevelopmentRegion", default)]
    pub development_region: Option<String>,
    #[serde(rename = "CFBundleIconFile", default)]
    pub icon_file: Option<String>,
    #[serde(rename = "CFBundleIconName", default)]
    pub icon_name: Option<String>,
    #[serde(rename = "CFBundleIcons", default)]
    pub icons: Option<BundleIcons>,
    #[serde(rename = "UIRequiredDeviceCapabilities", default)]
    pub required_device_capabilities: Option<Vec<String>>,
    #[serde(rename = "UISupportedDevices", default)]
    pub supported_devices: Option<Vec<String>>,
    #[serde(rename = "UISupportedInterfaceOrientations", default)]
    pub supported_interface_orientations: Option<Vec<String>>,
    #[serde(rename = "CFBundleLocalizations", default)]
    pub supported_languages: Option<Vec<String>>,
    #[serde(rename = "com.apple.developer.associated-domains", default)]
    pub associated_domains: Option<Vec<String>>,
}

impl InfoPlist {
    /// Display name, falling back to the bundle name.
    pub fn title(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Combined version label, e.g. `1.2 (42)`.
    pub fn version_label(&self) -> String {
        format!("{} ({})", self.short_version, self.version)
    }

    /// Recognised platforms, unknown identifiers dropped.
    pub fn platforms(&self) -> Vec<Platform> {
        self.supported_platforms
            .iter()
            .filter_map(|p| Platform::from_identifier(p))
            .collect()
    }

    /// Icon file names of the primary icon, if declared.
    pub fn primary_icon_files(&self) -> Option<&[String]> {
        self.icons
            .as_ref()?
            .primary_icon
            .as_ref()?
            .icon_files
            .as_deref()
    }
}

/// Structured information attached to bundle directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeMetadata {
    App(InfoPlist),
    AppExtension(InfoPlist),
}

impl NodeMetadata {
    /// The manifest regardless of bundle type.
    pub fn info(&self) -> &InfoPlist {
        match self {
            Self::App(info) | Self::AppExtension(info) => info,
        }
    }
}
