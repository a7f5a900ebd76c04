use bundlescope_core::{
    ArchiveNode, BinaryFormat, BuildConfig, Category, Checksum, ContentKind, NodeId, NodeKind,
    NodeMetadata, PackageKind, TreeStats,
};
use proptest::prelude::*;

fn leaf(id: &str, size: u64, checksum: Option<&str>) -> ArchiveNode {
    ArchiveNode::new_file(
        NodeId::new(id),
        id.rsplit('/').next().unwrap_or(id),
        size,
        checksum.map(Checksum::of),
        None,
        Vec::new(),
    )
}

fn assert_sizes_conserved(node: &ArchiveNode) {
    if !node.children.is_empty() {
        let sum: u64 = node.children.iter().map(|c| c.size).sum();
        assert_eq!(node.size, sum, "size mismatch at {}", node.id);
    }
    for child in &node.children {
        assert_sizes_conserved(child);
    }
}

#[test]
fn test_node_id_operations() {
    let root = NodeId::root();
    assert!(root.is_root());

    let app = root.join("Payload").join("Demo.app");
    assert!(!app.is_root());
    assert_eq!(app, NodeId::new("Payload/Demo.app"));
    assert_ne!(app.synthetic(0), app.synthetic(1));
}

#[test]
fn test_checksum_equality_only_depends_on_content() {
    assert_eq!(Checksum::of("same"), Checksum::of("same"));
    assert_ne!(Checksum::of("same"), Checksum::of("other"));
    assert_eq!(Checksum::new("abc").as_str(), "abc");
}

#[test]
fn test_directory_without_checksummed_children_has_no_checksum() {
    let dir = ArchiveNode::new_directory(
        NodeId::new("d"),
        "d",
        None,
        None,
        vec![leaf("d/unreadable", 3, None)],
    );
    assert_eq!(dir.size, 3);
    assert!(dir.checksum.is_none());
}

#[test]
fn test_nested_size_conservation() {
    let inner = ArchiveNode::new_directory(
        NodeId::new("a/b"),
        "b",
        None,
        None,
        vec![leaf("a/b/x", 7, Some("x")), leaf("a/b/y", 9, Some("y"))],
    );
    let outer = ArchiveNode::new_directory(
        NodeId::new("a"),
        "a",
        None,
        None,
        vec![inner, leaf("a/z", 4, Some("z"))],
    );
    let root = ArchiveNode::new_directory(NodeId::root(), "root", None, None, vec![outer]);

    assert_eq!(root.size, 20);
    assert_sizes_conserved(&root);

    let stats = TreeStats::from_root(&root);
    assert_eq!(stats.total_files, 3);
    assert_eq!(stats.total_dirs, 3);
}

#[test]
fn test_metadata_only_on_bundles() {
    let dir = ArchiveNode::new_directory(
        NodeId::new("Demo.app"),
        "Demo.app",
        Some(ContentKind::Package(PackageKind::App)),
        None,
        Vec::new(),
    );
    assert_eq!(dir.category, Category::App);
    assert!(dir.metadata.as_ref().map(NodeMetadata::info).is_none());
}

#[test]
fn test_synthetic_nodes() {
    let node = ArchiveNode::new_synthetic(
        NodeId::new("bin").synthetic(0),
        "__TEXT",
        12,
        Some(Checksum::of("bin/#0")),
        ContentKind::BinarySection,
    );
    assert_eq!(node.kind, NodeKind::Synthetic);
    assert_eq!(node.category, Category::Binary);
    assert!(node.is_leaf());

    let binary = ArchiveNode::new_file(
        NodeId::new("bin"),
        "bin",
        64,
        Some(Checksum::of("binary bytes")),
        Some(ContentKind::Binary(BinaryFormat::Elf)),
        vec![node],
    );
    assert_eq!(binary.size, 12);
    assert_eq!(binary.checksum, Some(Checksum::of("binary bytes")));
}

#[test]
fn test_config_defaults() {
    let config = BuildConfig::new("/tmp/App.ipa");
    assert!(config.compressed.is_none());
    assert!(config.expand_binaries);
    assert_eq!(config.max_concurrent_tools, 4);
}

proptest! {
    #[test]
    fn prop_directory_checksum_is_order_independent(
        contents in proptest::collection::vec("[a-z]{1,8}", 1..12),
        seed in any::<u64>(),
    ) {
        let children: Vec<ArchiveNode> = contents
            .iter()
            .enumerate()
            .map(|(i, c)| leaf(&format!("d/{i}"), c.len() as u64, Some(c.as_str())))
            .collect();

        let mut shuffled = children.clone();
        let len = shuffled.len();
        shuffled.rotate_left((seed as usize) % len);
        shuffled.reverse();

        let a = ArchiveNode::new_directory(NodeId::new("d"), "d", None, None, children);
        let b = ArchiveNode::new_directory(NodeId::new("d"), "d", None, None, shuffled);

        prop_assert_eq!(a.checksum, b.checksum);
        prop_assert_eq!(a.size, b.size);
    }
}
