//! Content signature detection.
//!
//! Detection order matters: magic numbers win over extensions, so an
//! executable named like a package is still a binary.

use std::path::Path;

use tokio::io::AsyncReadExt;

use bundlescope_core::{BinaryFormat, Category, ContentKind, GenericKind, NodeKind, PackageKind};

/// Number of header bytes inspected for magic numbers.
const MAGIC_LEN: u64 = 4;

const MACH_O_MAGIC: [[u8; 4]; 8] = [
    [0xFE, 0xED, 0xFA, 0xCE], // 32-bit big-endian
    [0xFE, 0xED, 0xFA, 0xCF], // 64-bit big-endian
    [0xCE, 0xFA, 0xED, 0xFE], // 32-bit little-endian
    [0xCF, 0xFA, 0xED, 0xFE], // 64-bit little-endian
    [0xBE, 0xBA, 0xFE, 0xCA], // universal, little-endian
    [0xCA, 0xFE, 0xBA, 0xBE], // universal, big-endian
    [0xCA, 0xFE, 0xBA, 0xBF], // 64-bit universal, big-endian
    [0xBF, 0xBA, 0xFE, 0xCA], // 64-bit universal, little-endian
];

const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

const PE_MAGIC: [u8; 2] = [b'M', b'Z'];

/// Result of classifying one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub content: Option<ContentKind>,
    pub category: Category,
}

impl Classification {
    /// Package hint used to decide on expansion and manifest parsing.
    pub fn package(&self) -> Option<PackageKind> {
        self.content.as_ref().and_then(ContentKind::package)
    }
}

/// Match the first bytes of a file against known executable formats.
pub fn sniff_binary(header: &[u8]) -> Option<BinaryFormat> {
    if MACH_O_MAGIC.iter().any(|magic| header.starts_with(magic)) {
        Some(BinaryFormat::MachO)
    } else if header.starts_with(&ELF_MAGIC) {
        Some(BinaryFormat::Elf)
    } else if header.starts_with(&PE_MAGIC) {
        Some(BinaryFormat::WindowsPe)
    } else {
        None
    }
}

/// Look an extension up in the registry of common file types.
pub fn generic_kind(extension: &str) -> Option<GenericKind> {
    let kind = match extension.to_ascii_lowercase().as_str() {
        "ttf" | "otf" | "ttc" | "woff" | "woff2" | "pfb" => GenericKind::Font,
        // images
        "png" | "jpg" | "jpeg" | "gif" | "heic" | "heif" | "webp" | "tif" | "tiff" | "bmp"
        | "ico" | "icns" | "svg" | "pdf"
        // audio and video
        | "mp3" | "m4a" | "aac" | "wav" | "caf" | "aif" | "aiff" | "mp4" | "m4v" | "mov"
        // text and documents
        | "txt" | "md" | "rtf" | "html" | "htm" | "css" | "js" | "json" | "xml" | "plist"
        | "strings" | "stringsdict" | "csv" | "yaml" | "yml" => GenericKind::Content,
        "db" | "sqlite" | "realm" | "bin" | "dat" | "zip" | "gz" | "nib" | "storyboardc"
        | "mobileprovision" | "der" | "cer" | "p12" | "sinf" | "supp" | "supf" | "supx"
        | "metallib" | "mom" | "omo" | "dylib" | "a" | "o" => GenericKind::Data,
        _ => return None,
    };
    Some(kind)
}

/// Classify from an already read header and the entry name.
///
/// Never fails: unrecognised entries degrade to `folder` or `data`.
pub fn classify(name: &Path, kind: NodeKind, header: Option<&[u8]>) -> Classification {
    let extension = name.extension().and_then(|e| e.to_str());

    let content = header
        .and_then(sniff_binary)
        .map(ContentKind::Binary)
        .or_else(|| extension.and_then(PackageKind::from_extension).map(ContentKind::Package))
        .or_else(|| extension.and_then(generic_kind).map(ContentKind::Generic));

    Classification {
        category: Category::classify(content.as_ref(), kind),
        content,
    }
}

/// Classify an entry on disk, reading the header of regular files.
pub async fn classify_path(path: &Path, kind: NodeKind) -> Classification {
    let header = if kind.is_file() {
        read_header(path).await
    } else {
        None
    };
    let classification = classify(path, kind, header.as_deref());
    tracing::trace!(path = %path.display(), category = %classification.category, "classified");
    classification
}

async fn read_header(path: &Path) -> Option<Vec<u8>> {
    let file = tokio::fs::File::open(path).await.ok()?;
    let mut header = Vec::with_capacity(MAGIC_LEN as usize);
    file.take(MAGIC_LEN).read_to_end(&mut header).await.ok()?;
    Some(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_binary_formats() {
        assert_eq!(sniff_binary(&[0xCF, 0xFA, 0xED, 0xFE]), Some(BinaryFormat::MachO));
        assert_eq!(sniff_binary(&[0xCA, 0xFE, 0xBA, 0xBE]), Some(BinaryFormat::MachO));
        assert_eq!(sniff_binary(b"\x7FELF"), Some(BinaryFormat::Elf));
        assert_eq!(sniff_binary(b"MZ\x90\x00"), Some(BinaryFormat::WindowsPe));
        assert_eq!(sniff_binary(b"PK\x03\x04"), None);
        assert_eq!(sniff_binary(&[0xCF, 0xFA]), None);
        assert_eq!(sniff_binary(&[]), None);
    }

    #[test]
    fn test_binary_wins_over_package_extension() {
        let classification = classify(
            Path::new("Payload/Tricky.framework"),
            NodeKind::File,
            Some([0xCF, 0xFA, 0xED, 0xFE].as_slice()),
        );
        assert_eq!(classification.category, Category::Binary);
        assert_eq!(
            classification.content,
            Some(ContentKind::Binary(BinaryFormat::MachO))
        );
    }

    #[test]
    fn test_package_extensions() {
        let app = classify(Path::new("Payload/Demo.app"), NodeKind::Directory, None);
        assert_eq!(app.category, Category::App);
        assert_eq!(app.package(), Some(PackageKind::App));

        let car = classify(Path::new("Assets.car"), NodeKind::File, Some(b"BOMS".as_slice()));
        assert_eq!(car.category, Category::AssetCatalog);

        let lproj = classify(Path::new("en.lproj"), NodeKind::Directory, None);
        assert_eq!(lproj.category, Category::Localization);
    }

    #[test]
    fn test_generic_registry() {
        assert_eq!(
            classify(Path::new("icon.PNG"), NodeKind::File, Some(b"\x89PNG".as_slice())).category,
            Category::Content
        );
        assert_eq!(
            classify(Path::new("Inter.ttf"), NodeKind::File, Some(b"\0\x01\0\0".as_slice())).category,
            Category::Font
        );
        assert_eq!(
            classify(Path::new("store.sqlite"), NodeKind::File, None).category,
            Category::Data
        );
    }

    #[test]
    fn test_unrecognised_entries_degrade() {
        assert_eq!(
            classify(Path::new("Frameworks"), NodeKind::Directory, None).category,
            Category::Folder
        );
        assert_eq!(
            classify(Path::new("blob.xyz"), NodeKind::File, Some(b"????".as_slice())).category,
            Category::Data
        );
    }
}
