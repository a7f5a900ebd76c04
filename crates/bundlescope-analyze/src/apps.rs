//! Application and extension discovery.

use serde::{Deserialize, Serialize};

use bundlescope_core::{ArchiveNode, InfoPlist, NodeId, NodeMetadata, PackageKind, Platform};

/// Scale suffixes tried for PNG icons, best first.
const ICON_SCALES: [&str; 3] = ["@3x", "@2x", ""];

/// Where macOS bundles keep their icon.
const MAC_RESOURCES: &str = "Contents/Resources";

/// An application or extension bundle found in the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveApp {
    /// Identity of the bundle directory.
    pub id: NodeId,
    /// App or app extension.
    pub kind: PackageKind,
    /// Display name, falling back to the bundle name.
    pub name: String,
    /// Bundle identifier.
    pub identifier: String,
    /// Version label, e.g. `1.2 (42)`.
    pub version: String,
    /// Recognised supported platforms.
    pub platforms: Vec<Platform>,
    /// Minimum OS version, if declared.
    pub minimum_os_version: Option<String>,
    /// Size of the bundle in bytes.
    pub size: u64,
    /// Best icon file present in the bundle.
    pub icon: Option<NodeId>,
}

impl ArchiveApp {
    fn from_node(node: &ArchiveNode, kind: PackageKind, info: &InfoPlist) -> Self {
        Self {
            id: node.id.clone(),
            kind,
            name: info.title().to_string(),
            identifier: info.identifier.clone(),
            version: info.version_label(),
            platforms: info.platforms(),
            minimum_os_version: info.minimum_os_version.clone(),
            size: node.size,
            icon: resolve_icon(node, info),
        }
    }

    /// Check if this is a top-level application rather than an extension.
    pub fn is_app(&self) -> bool {
        self.kind == PackageKind::App
    }
}

/// Every bundle with a parsed manifest, in pre-order.
pub fn find_apps(root: &ArchiveNode) -> Vec<ArchiveApp> {
    root.descendants()
        .filter_map(|node| match &node.metadata {
            Some(NodeMetadata::App(info)) => Some(ArchiveApp::from_node(node, PackageKind::App, info)),
            Some(NodeMetadata::AppExtension(info)) => {
                Some(ArchiveApp::from_node(node, PackageKind::AppExtension, info))
            }
            None => None,
        })
        .collect()
}

/// Icon names declared by a manifest, most specific first.
fn icon_names(info: &InfoPlist) -> Vec<&str> {
    let mut names: Vec<&str> = info
        .primary_icon_files()
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .collect();
    names.extend(info.icon_file.as_deref());
    names.extend(info.icon_name.as_deref());
    names.dedup();
    names
}

fn resolve_icon(bundle: &ArchiveNode, info: &InfoPlist) -> Option<NodeId> {
    let names = icon_names(info);

    let png = names.iter().flat_map(|name| {
        let stem = name.strip_suffix(".png").unwrap_or(*name);
        ICON_SCALES
            .iter()
            .map(move |scale| format!("{stem}{scale}.png"))
    });
    let icns = names.iter().map(|name| {
        let stem = name.strip_suffix(".icns").unwrap_or(*name);
        format!("{MAC_RESOURCES}/{stem}.icns")
    });

    png.chain(icns)
        .map(|candidate| bundle.id.join(candidate))
        .find(|id| bundle.find(id).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlescope_core::{BundleIcon, BundleIcons, Checksum};

    fn info(icon_files: Option<Vec<&str>>, icon_file: Option<&str>) -> InfoPlist {
        InfoPlist {
            identifier: "com.example.demo".to_string(),
            name: "Demo".to_string(),
            display_name: Some("Demo Pro".to_string()),
            short_version: "1.2".to_string(),
            version: "42".to_string(),
            supported_platforms: vec!["iPhoneOS".to_string(), "visionOS".to_string()],
            executable: None,
            minimum_os_version: Some("16.0".to_string()),
            development_region: None,
            icon_file: icon_file.map(str::to_string),
            icon_name: None,
            icons: icon_files.map(|files| BundleIcons {
                primary_icon: Some(BundleIcon {
                    icon_files: Some(files.into_iter().map(str::to_string).collect()),
                    icon_name: None,
                }),
                alternate_icons: None,
            }),
            required_device_capabilities: None,
            supported_devices: None,
            supported_interface_orientations: None,
            supported_languages: None,
            associated_domains: None,
        }
    }

    fn file(id: NodeId) -> ArchiveNode {
        let name = id.as_path().file_name().unwrap().to_string_lossy().to_string();
        ArchiveNode::new_file(id, name, 10, Some(Checksum::of("x")), None, Vec::new())
    }

    fn bundle(id: &str, files: &[&str], metadata: NodeMetadata) -> ArchiveNode {
        let bundle_id = NodeId::new(id);
        let children = files.iter().map(|f| file(bundle_id.join(f))).collect();
        ArchiveNode::new_directory(bundle_id, id, None, Some(metadata), children)
    }

    #[test]
    fn test_app_fields() {
        let app = bundle(
            "Demo.app",
            &["AppIcon60x60@2x.png"],
            NodeMetadata::App(info(Some(vec!["AppIcon60x60"]), None)),
        );
        let apps = find_apps(&app);

        assert_eq!(apps.len(), 1);
        let found = &apps[0];
        assert!(found.is_app());
        assert_eq!(found.name, "Demo Pro");
        assert_eq!(found.version, "1.2 (42)");
        assert_eq!(found.platforms, vec![Platform::Iphone]);
        assert_eq!(found.size, 10);
        assert_eq!(found.icon, Some(NodeId::new("Demo.app/AppIcon60x60@2x.png")));
    }

    #[test]
    fn test_icon_prefers_higher_scale() {
        let app = bundle(
            "Demo.app",
            &["Icon.png", "Icon@3x.png", "Icon@2x.png"],
            NodeMetadata::App(info(Some(vec!["Icon"]), None)),
        );
        assert_eq!(find_apps(&app)[0].icon, Some(NodeId::new("Demo.app/Icon@3x.png")));
    }

    #[test]
    fn test_mac_icon_in_resources() {
        let app_id = NodeId::new("Demo.app");
        let resources = ArchiveNode::new_directory(
            app_id.join("Contents"),
            "Contents",
            None,
            None,
            vec![ArchiveNode::new_directory(
                app_id.join("Contents/Resources"),
                "Resources",
                None,
                None,
                vec![file(app_id.join("Contents/Resources/AppIcon.icns"))],
            )],
        );
        let app = ArchiveNode::new_directory(
            app_id,
            "Demo.app",
            None,
            Some(NodeMetadata::App(info(None, Some("AppIcon")))),
            vec![resources],
        );

        assert_eq!(
            find_apps(&app)[0].icon,
            Some(NodeId::new("Demo.app/Contents/Resources/AppIcon.icns"))
        );
    }

    #[test]
    fn test_missing_icon_and_extensions() {
        let extension = bundle(
            "Demo.app/PlugIns/Widget.appex",
            &[],
            NodeMetadata::AppExtension(info(Some(vec!["Missing"]), None)),
        );
        let app = ArchiveNode::new_directory(
            NodeId::new("Demo.app"),
            "Demo.app",
            None,
            Some(NodeMetadata::App(info(None, None))),
            vec![extension],
        );

        let apps = find_apps(&app);
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[1].kind, PackageKind::AppExtension);
        assert!(apps.iter().all(|a| a.icon.is_none()));
    }
}
