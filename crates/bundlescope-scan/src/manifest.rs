//! Bundle manifest reading.

use std::path::{Path, PathBuf};

use thiserror::Error;

use bundlescope_core::{InfoPlist, NodeMetadata, PackageKind};

/// Manifest locations relative to the bundle, in lookup order.
const MANIFEST_PATHS: [&str; 2] = ["Info.plist", "Contents/Info.plist"];

/// Errors reading a bundle manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// None of the known manifest locations exist.
    #[error("No Info.plist in {path}")]
    NotFound { path: PathBuf },

    /// The manifest exists but could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not a valid property list or lacks required keys.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: plist::Error,
    },
}

/// Find and parse the `Info.plist` of a bundle directory.
pub async fn read_info_plist(bundle: &Path) -> Result<InfoPlist, ManifestError> {
    for relative in MANIFEST_PATHS {
        let path = bundle.join(relative);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(source) => return Err(ManifestError::Io { path, source }),
        };
        return plist::from_bytes(&bytes).map_err(|source| ManifestError::Parse { path, source });
    }

    Err(ManifestError::NotFound {
        path: bundle.to_path_buf(),
    })
}

/// Read the metadata attached to a package directory of the given kind.
///
/// Returns `Ok(None)` for packages that carry no manifest.
pub async fn read_metadata(
    bundle: &Path,
    package: PackageKind,
) -> Result<Option<NodeMetadata>, ManifestError> {
    let metadata = match package {
        PackageKind::App => NodeMetadata::App(read_info_plist(bundle).await?),
        PackageKind::AppExtension => NodeMetadata::AppExtension(read_info_plist(bundle).await?),
        _ => return Ok(None),
    };
    Ok(Some(metadata))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>CFBundleIdentifier</key>
    <string>com.example.demo</string>
    <key>CFBundleName</key>
    <string>Demo</string>
    <key>CFBundleShortVersionString</key>
    <string>1.4</string>
    <key>CFBundleVersion</key>
    <string>87</string>
    <key>CFBundleSupportedPlatforms</key>
    <array>
        <string>iPhoneOS</string>
    </array>
</dict>
</plist>"#;

    #[tokio::test]
    async fn test_reads_top_level_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Info.plist"), INFO_PLIST).unwrap();

        let info = read_info_plist(dir.path()).await.unwrap();
        assert_eq!(info.identifier, "com.example.demo");
        assert_eq!(info.version_label(), "1.4 (87)");
    }

    #[tokio::test]
    async fn test_reads_nested_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Contents")).unwrap();
        std::fs::write(dir.path().join("Contents/Info.plist"), INFO_PLIST).unwrap();

        let metadata = read_metadata(dir.path(), PackageKind::AppExtension)
            .await
            .unwrap();
        assert!(matches!(metadata, Some(NodeMetadata::AppExtension(_))));
    }

    #[tokio::test]
    async fn test_missing_and_malformed_manifests() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_info_plist(dir.path()).await,
            Err(ManifestError::NotFound { .. })
        ));

        std::fs::write(dir.path().join("Info.plist"), "not a plist").unwrap();
        assert!(matches!(
            read_info_plist(dir.path()).await,
            Err(ManifestError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_frameworks_carry_no_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = read_metadata(dir.path(), PackageKind::Framework).await.unwrap();
        assert!(metadata.is_none());
    }
}
