//! Archive node types.

use std::cmp::Reverse;
use std::fmt;
use std::path::{Path, PathBuf};

use compact_str::CompactString;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::category::{Category, ContentKind};
use crate::metadata::NodeMetadata;

/// Stable identity of a node: its archive-relative path.
///
/// The root of an archive has the empty path. Synthetic nodes live below
/// the file they were derived from, under a `#<index>` component that can
/// never collide with a real entry of a regular file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(PathBuf);

impl NodeId {
    /// Identity of the archive root.
    pub fn root() -> Self {
        Self(PathBuf::new())
    }

    /// Create an identity from an archive-relative path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Identity of a named entry below this one.
    pub fn join(&self, name: impl AsRef<Path>) -> Self {
        Self(self.0.join(name))
    }

    /// Identity of the `index`-th synthetic child of this node.
    pub fn synthetic(&self, index: usize) -> Self {
        Self(self.0.join(format!("#{index}")))
    }

    /// The archive-relative path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Check if this is the archive root.
    pub fn is_root(&self) -> bool {
        self.0.as_os_str().is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str(".")
        } else {
            write!(f, "{}", self.0.display())
        }
    }
}

/// Content fingerprint used for exact duplicate detection.
///
/// Stored as a lowercase hex string so digests reported by external tools
/// and locally computed BLAKE3 hashes share one representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Checksum(CompactString);

impl Checksum {
    /// Wrap an already computed digest.
    pub fn new(digest: impl Into<CompactString>) -> Self {
        Self(digest.into())
    }

    /// Hash arbitrary bytes.
    pub fn of(bytes: impl AsRef<[u8]>) -> Self {
        Self::from(blake3::hash(bytes.as_ref()))
    }

    /// Combine child checksums into a directory checksum.
    ///
    /// The checksums are sorted before concatenation so the result does not
    /// depend on enumeration order. Returns `None` when there is nothing to
    /// combine.
    pub fn combine<'a>(checksums: impl IntoIterator<Item = &'a Checksum>) -> Option<Self> {
        let joined: String = checksums.into_iter().map(Checksum::as_str).sorted().collect();
        if joined.is_empty() {
            return None;
        }
        Some(Self::of(joined))
    }

    /// Get the digest as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<blake3::Hash> for Checksum {
    fn from(hash: blake3::Hash) -> Self {
        Self(CompactString::new(hash.to_hex().as_str()))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Type of archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Entry fabricated from external tool output.
    Synthetic,
}

impl NodeKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File)
    }

    /// Check if this is a synthetic entry.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, NodeKind::Synthetic)
    }
}

/// A single entry of the archive hierarchy.
///
/// Nodes are built bottom-up and never mutated afterwards, so the size and
/// checksum of a node with children are always derived from those children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveNode {
    /// Unique identity of this node.
    pub id: NodeId,

    /// Display label.
    pub name: CompactString,

    /// Node type.
    pub kind: NodeKind,

    /// Detected content signature, if any.
    pub content: Option<ContentKind>,

    /// Display category.
    pub category: Category,

    /// Size in bytes (sum of children when there are any).
    pub size: u64,

    /// Content fingerprint.
    pub checksum: Option<Checksum>,

    /// Parsed bundle manifest (app and app extension directories only).
    pub metadata: Option<NodeMetadata>,

    /// Children in enumeration order.
    pub children: Vec<ArchiveNode>,
}

impl ArchiveNode {
    /// Create a file node.
    ///
    /// `len` is the on-disk length; it is only used when the file was not
    /// expanded into synthetic children.
    pub fn new_file(
        id: NodeId,
        name: impl Into<CompactString>,
        len: u64,
        checksum: Option<Checksum>,
        content: Option<ContentKind>,
        children: Vec<ArchiveNode>,
    ) -> Self {
        let size = if children.is_empty() {
            len
        } else {
            total_size(&children)
        };

        Self {
            id,
            name: name.into(),
            kind: NodeKind::File,
            category: Category::classify(content.as_ref(), NodeKind::File),
            content,
            size,
            checksum,
            metadata: None,
            children,
        }
    }

    /// Create a directory node from its fully built children.
    pub fn new_directory(
        id: NodeId,
        name: impl Into<CompactString>,
        content: Option<ContentKind>,
        metadata: Option<NodeMetadata>,
        children: Vec<ArchiveNode>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind: NodeKind::Directory,
            category: Category::classify(content.as_ref(), NodeKind::Directory),
            content,
            size: total_size(&children),
            checksum: Checksum::combine(children.iter().filter_map(|c| c.checksum.as_ref())),
            metadata,
            children,
        }
    }

    /// Create a synthetic leaf.
    pub fn new_synthetic(
        id: NodeId,
        name: impl Into<CompactString>,
        size: u64,
        checksum: Option<Checksum>,
        content: ContentKind,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind: NodeKind::Synthetic,
            category: Category::classify(Some(&content), NodeKind::Synthetic),
            content: Some(content),
            size,
            checksum,
            metadata: None,
            children: Vec::new(),
        }
    }

    /// Check if this node is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Get the number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Children sorted by size, largest first.
    pub fn children_by_size(&self) -> Vec<&ArchiveNode> {
        let mut children: Vec<&ArchiveNode> = self.children.iter().collect();
        children.sort_by_key(|c| Reverse(c.size));
        children
    }

    /// Children grouped by category priority, largest first within a category.
    pub fn children_by_category(&self) -> Vec<&ArchiveNode> {
        let mut children = self.children_by_size();
        children.sort_by_key(|c| c.category);
        children
    }

    /// Pre-order iterator over this node and all of its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Find a node by identity in this subtree.
    pub fn find(&self, id: &NodeId) -> Option<&ArchiveNode> {
        if !id.as_path().starts_with(self.id.as_path()) {
            return None;
        }
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

impl fmt::Display for ArchiveNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {} bytes", self.name, self.category, self.size)
    }
}

/// Pre-order traversal of a subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a ArchiveNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a ArchiveNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

fn total_size(children: &[ArchiveNode]) -> u64 {
    children.iter().map(|c| c.size).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{BinaryFormat, PackageKind};

    fn file(name: &str, size: u64, content: &str) -> ArchiveNode {
        ArchiveNode::new_file(
            NodeId::root().join(name),
            name,
            size,
            Some(Checksum::of(content)),
            None,
            Vec::new(),
        )
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::root().to_string(), ".");
        assert_eq!(NodeId::root().join("Payload").join("A.app").to_string(), "Payload/A.app");
        assert_eq!(NodeId::new("A.app/A").synthetic(2).to_string(), "A.app/A/#2");
    }

    #[test]
    fn test_checksum_combine_is_order_independent() {
        let a = Checksum::of("a");
        let b = Checksum::of("b");
        assert_eq!(Checksum::combine([&a, &b]), Checksum::combine([&b, &a]));
        assert_ne!(Checksum::combine([&a]), Checksum::combine([&a, &b]));
        assert_eq!(Checksum::combine([]), None);
    }

    #[test]
    fn test_checksum_hex() {
        let checksum = Checksum::of("hello");
        assert_eq!(checksum.as_str().len(), 64);
        assert!(checksum.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_directory_aggregates_children() {
        let dir = ArchiveNode::new_directory(
            NodeId::root(),
            "root",
            None,
            None,
            vec![file("a", 10, "a"), file("b", 32, "b")],
        );
        assert_eq!(dir.size, 42);
        assert_eq!(dir.category, Category::Folder);
        assert!(dir.checksum.is_some());
    }

    #[test]
    fn test_empty_directory_has_no_checksum() {
        let dir = ArchiveNode::new_directory(NodeId::root(), "empty", None, None, Vec::new());
        assert_eq!(dir.size, 0);
        assert!(dir.checksum.is_none());
    }

    #[test]
    fn test_expanded_file_size_follows_children() {
        let id = NodeId::new("App");
        let children = vec![
            ArchiveNode::new_synthetic(id.synthetic(0), "__TEXT", 70, None, ContentKind::BinarySection),
            ArchiveNode::new_synthetic(id.synthetic(1), "__DATA", 20, None, ContentKind::BinarySection),
        ];
        let node = ArchiveNode::new_file(
            id,
            "App",
            100,
            Some(Checksum::of("bytes")),
            Some(ContentKind::Binary(BinaryFormat::MachO)),
            children,
        );
        assert_eq!(node.size, 90);
        assert_eq!(node.category, Category::Binary);
    }

    #[test]
    fn test_children_views() {
        let framework = ArchiveNode::new_directory(
            NodeId::new("F.framework"),
            "F.framework",
            Some(ContentKind::Package(PackageKind::Framework)),
            None,
            vec![file("F.framework/F", 5, "f")],
        );
        let dir = ArchiveNode::new_directory(
            NodeId::root(),
            "root",
            None,
            None,
            vec![file("small", 1, "s"), file("big", 100, "b"), framework],
        );

        let by_size: Vec<&str> = dir.children_by_size().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(by_size, vec!["big", "F.framework", "small"]);

        let by_category: Vec<&str> =
            dir.children_by_category().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(by_category, vec!["F.framework", "big", "small"]);
    }

    #[test]
    fn test_descendants_pre_order() {
        let inner = ArchiveNode::new_directory(
            NodeId::new("d"),
            "d",
            None,
            None,
            vec![file("d/x", 1, "x")],
        );
        let root = ArchiveNode::new_directory(
            NodeId::root(),
            "root",
            None,
            None,
            vec![inner, file("y", 1, "y")],
        );
        let ids: Vec<String> = root.descendants().map(|n| n.id.to_string()).collect();
        assert_eq!(ids, vec![".", "d", "d/x", "y"]);
        assert!(root.find(&NodeId::new("d/x")).is_some());
        assert!(root.find(&NodeId::new("nope")).is_none());
    }
}
