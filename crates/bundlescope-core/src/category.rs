//! Content kinds and display categories.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::node::NodeKind;

/// Executable container formats recognised by their magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryFormat {
    MachO,
    Elf,
    WindowsPe,
}

impl BinaryFormat {
    /// Human readable name of the format.
    pub fn description(self) -> &'static str {
        match self {
            Self::MachO => "Mach-O",
            Self::Elf => "ELF",
            Self::WindowsPe => "Windows PE",
        }
    }
}

/// Bundle-like entries recognised by their file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageKind {
    /// `.app`
    App,
    /// `.appex`
    AppExtension,
    /// `.bundle`
    Bundle,
    /// `.car`
    AssetCatalog,
    /// `.framework`
    Framework,
    /// `.lproj`
    Localization,
    /// `.mlmodelc`
    CoreMlModel,
    /// `.momd`
    CoreDataModel,
}

impl PackageKind {
    /// Match a file extension (without the dot) against the known packages.
    pub fn from_extension(extension: &str) -> Option<Self> {
        Some(match extension {
            "app" => Self::App,
            "appex" => Self::AppExtension,
            "bundle" => Self::Bundle,
            "car" => Self::AssetCatalog,
            "framework" => Self::Framework,
            "lproj" => Self::Localization,
            "mlmodelc" => Self::CoreMlModel,
            "momd" => Self::CoreDataModel,
            _ => return None,
        })
    }

    /// Human readable name of the package kind.
    pub fn description(self) -> &'static str {
        match self {
            Self::App => "Application",
            Self::AppExtension => "App Extension",
            Self::Bundle => "Bundle",
            Self::AssetCatalog => "Asset Catalog",
            Self::Framework => "Framework",
            Self::Localization => "Localization Files",
            Self::CoreMlModel => "Core ML Model",
            Self::CoreDataModel => "Core Data Model",
        }
    }

    /// Whether directories of this kind carry an `Info.plist` worth reading.
    pub fn has_manifest(self) -> bool {
        matches!(self, Self::App | Self::AppExtension)
    }
}

/// Broad capability of a registered, non-package file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenericKind {
    /// Human consumable content: images, audio, video, text, documents.
    Content,
    /// Structured or opaque data.
    Data,
    Font,
}

/// Detected content signature of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    /// Executable file.
    Binary(BinaryFormat),
    /// Synthetic segment of an executable.
    BinarySection,
    /// Synthetic asset inside a compiled asset catalog.
    Asset,
    /// Package recognised by extension.
    Package(PackageKind),
    /// Registered file type.
    Generic(GenericKind),
}

impl ContentKind {
    /// Human readable label, `None` for synthetic entries.
    pub fn display_name(&self) -> Option<&'static str> {
        match self {
            Self::Asset | Self::BinarySection => None,
            _ => Some(self.description()),
        }
    }

    /// Human readable description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Binary(format) => format.description(),
            Self::BinarySection => "Binary Section",
            Self::Asset => "Asset",
            Self::Package(package) => package.description(),
            Self::Generic(GenericKind::Content) => "Content",
            Self::Generic(GenericKind::Data) => "Data",
            Self::Generic(GenericKind::Font) => "Font",
        }
    }

    /// Package kind, if this is a package.
    pub fn package(&self) -> Option<PackageKind> {
        match self {
            Self::Package(package) => Some(*package),
            _ => None,
        }
    }
}

/// Display category of a node.
///
/// Declaration order is the display priority: sorting by category puts
/// binaries first and opaque data last.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Category {
    Binary,
    App,
    AppExtension,
    Framework,
    Bundle,
    AssetCatalog,
    Localization,
    Model,
    Folder,
    Font,
    Content,
    Data,
}

impl Category {
    /// Derive the category from a detected content kind and the entry type.
    pub fn classify(content: Option<&ContentKind>, kind: NodeKind) -> Self {
        match content {
            Some(ContentKind::Asset) => Self::AssetCatalog,
            Some(ContentKind::Binary(_) | ContentKind::BinarySection) => Self::Binary,
            Some(ContentKind::Package(package)) => match package {
                PackageKind::App => Self::App,
                PackageKind::AppExtension => Self::AppExtension,
                PackageKind::Bundle => Self::Bundle,
                PackageKind::AssetCatalog => Self::AssetCatalog,
                PackageKind::Framework => Self::Framework,
                PackageKind::Localization => Self::Localization,
                PackageKind::CoreMlModel | PackageKind::CoreDataModel => Self::Model,
            },
            Some(ContentKind::Generic(generic)) => match generic {
                GenericKind::Content => Self::Content,
                GenericKind::Data => Self::Data,
                GenericKind::Font => Self::Font,
            },
            None if kind.is_dir() => Self::Folder,
            None => Self::Data,
        }
    }

    /// Sort priority, lower comes first.
    pub fn priority(self) -> u8 {
        self as u8
    }
}
