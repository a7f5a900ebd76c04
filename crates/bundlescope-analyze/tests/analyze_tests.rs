use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use bundlescope_analyze::{
    ArchiveAnalysis, DuplicateConfig, DuplicateIndex, DuplicateReport, ParentIndex,
};
use bundlescope_core::{ArchiveNode, ArchiveTree, BuildConfig, Checksum, NodeId};
use proptest::prelude::*;

fn file(id: &str, content: &str) -> ArchiveNode {
    ArchiveNode::new_file(
        NodeId::new(id),
        id.rsplit('/').next().unwrap_or(id),
        content.len() as u64,
        Some(Checksum::of(content)),
        None,
        Vec::new(),
    )
}

fn dir(id: &str, children: Vec<ArchiveNode>) -> ArchiveNode {
    ArchiveNode::new_directory(
        NodeId::new(id),
        id.rsplit('/').next().unwrap_or(id),
        None,
        None,
        children,
    )
}

/// Two identical folders `F`, each containing the same file `G`, plus a
/// lone file outside them.
fn duplicated_folders() -> ArchiveNode {
    dir(
        "",
        vec![
            dir("a", vec![dir("a/F", vec![file("a/F/G", "shared"), file("a/F/H", "other")])]),
            dir("b", vec![dir("b/F", vec![file("b/F/G", "shared"), file("b/F/H", "other")])]),
            file("readme", "unique"),
        ],
    )
}

#[test]
fn test_global_view_contains_nested_groups() {
    let root = duplicated_folders();
    let index = DuplicateIndex::build(&root);

    // F, G, H and the parents a/b (which only contain F) are duplicated.
    let counts: Vec<usize> = index.groups().iter().map(|g| g.count()).collect();
    assert_eq!(counts, vec![2, 2, 2, 2]);
    assert!(index.is_duplicate(&NodeId::new("a/F/G")));
    assert!(!index.is_duplicate(&NodeId::new("readme")));
    assert!(!index.is_duplicate(&NodeId::root()));
}

#[test]
fn test_top_level_suppression() {
    let root = ArchiveNode::new_directory(
        NodeId::root(),
        "root",
        None,
        None,
        vec![
            dir("F1", vec![file("F1/G", "shared"), file("F1/x", "x")]),
            dir("F2", vec![file("F2/G", "shared"), file("F2/x", "x")]),
            file("loose", "loose"),
        ],
    );
    let index = DuplicateIndex::build(&root);

    let folder_checksum = root.children[0].checksum.clone().unwrap();
    let file_checksum = Checksum::of("shared");
    assert!(index.group(&folder_checksum).is_some());
    assert!(index.group(&file_checksum).is_some());

    let top_level: Vec<&Checksum> = index.top_level().iter().map(|g| &g.checksum).collect();
    assert_eq!(top_level, vec![&folder_checksum]);
    assert_eq!(
        index.top_level()[0].nodes,
        vec![NodeId::new("F1"), NodeId::new("F2")]
    );
}

#[test]
fn test_nested_duplicate_reported_when_also_found_outside() {
    let root = ArchiveNode::new_directory(
        NodeId::root(),
        "root",
        None,
        None,
        vec![
            dir("F1", vec![file("F1/G", "shared"), file("F1/x", "x")]),
            dir("F2", vec![file("F2/G", "shared"), file("F2/x", "x")]),
            file("G", "shared"),
        ],
    );
    let index = DuplicateIndex::build(&root);

    let top_level = index.top_level();
    assert_eq!(top_level.len(), 2);
    assert_eq!(top_level[1].checksum, Checksum::of("shared"));
    assert_eq!(top_level[1].count(), 3);
}

#[test]
fn test_report_over_global_view() {
    let index = DuplicateIndex::build(&duplicated_folders());

    let top = DuplicateReport::new(&index, &DuplicateConfig::default());
    assert_eq!(top.group_count, 1);
    assert_eq!(top.groups[0].nodes, vec![NodeId::new("a"), NodeId::new("b")]);
    assert_eq!(top.total_wasted_space, 11);

    let config = DuplicateConfig::builder().top_level_only(false).build().unwrap();
    let all = DuplicateReport::new(&index, &config);
    assert_eq!(all.group_count, 4);
    assert!(all.has_duplicates());
}

#[test]
fn test_analysis_snapshot() {
    let tree = ArchiveTree::new(
        duplicated_folders(),
        PathBuf::from("/tmp/Demo.ipa"),
        BuildConfig::default(),
        Duration::ZERO,
        Vec::new(),
    );
    let analysis = ArchiveAnalysis::new(&tree);

    assert_eq!(analysis.duplicates.len(), 4);
    assert_eq!(analysis.parents.parent(&NodeId::new("b/F/H")), Some(&NodeId::new("b/F")));
    assert!(analysis.apps.is_empty());
    assert_eq!(analysis.breakdown.total_size(), tree.total_size());
    assert!(analysis.owning_app(&NodeId::new("b/F/H")).is_none());
}

#[test]
fn test_parent_index_covers_every_non_root_node() {
    let root = duplicated_folders();
    let index = ParentIndex::build(&root);
    assert_eq!(index.len(), root.descendants().count() - 1);
}

/// Random flat trees where contents are drawn from a small alphabet so
/// collisions are frequent.
fn flat_tree() -> impl Strategy<Value = ArchiveNode> {
    proptest::collection::vec(prop_oneof![Just("a"), Just("b"), Just("c"), Just("d")], 0..24)
        .prop_map(|contents| {
            let children = contents
                .iter()
                .enumerate()
                .map(|(i, c)| file(&format!("f{i}"), c))
                .collect();
            ArchiveNode::new_directory(NodeId::root(), "root", None, None, children)
        })
}

proptest! {
    #[test]
    fn prop_duplicate_symmetry(root in flat_tree()) {
        let index = DuplicateIndex::build(&root);

        let mut occurrences: HashMap<&Checksum, usize> = HashMap::new();
        for node in root.children.iter() {
            *occurrences.entry(node.checksum.as_ref().unwrap()).or_default() += 1;
        }

        for a in &root.children {
            for b in &root.children {
                let same_checksum = a.checksum == b.checksum;
                let same_group = match (index.group_of(&a.id), index.group_of(&b.id)) {
                    (Some(ga), Some(gb)) => ga.checksum == gb.checksum,
                    _ => false,
                };
                let duplicated = occurrences[a.checksum.as_ref().unwrap()] > 1;
                prop_assert_eq!(same_group, same_checksum && duplicated);
            }
        }
    }
}
