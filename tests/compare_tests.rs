use std::fs::File;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use syncscan::afs::{HandleError, MemoryFileSystem};
use syncscan::compare::{
    CompareCategory, CompareNode, CompareOptions, FolderComparison, FolderPairConfig,
    compare_folder_pairs,
};
use syncscan::filter::FilterConfig;
use syncscan::types::SymlinkHandling;

fn compare(pairs: &[FolderPairConfig], opts: &CompareOptions) -> Vec<FolderComparison> {
    compare_folder_pairs(pairs, opts, |_, _| Ok(HandleError::Continue), |_, _| Ok(())).unwrap()
}

fn compare_one(left: &Arc<MemoryFileSystem>, right: &Arc<MemoryFileSystem>) -> FolderComparison {
    let pair = FolderPairConfig::new(left.path(""), right.path(""));
    compare(&[pair], &CompareOptions::default()).remove(0)
}

fn find<'a>(nodes: &'a [CompareNode], rel_path: &str) -> &'a CompareNode {
    for node in nodes {
        if node.rel_path == rel_path {
            return node;
        }
        if rel_path.starts_with(&format!("{}/", node.rel_path)) {
            return find(&node.children, rel_path);
        }
    }
    panic!("{rel_path} not in comparison");
}

fn category_of(c: &FolderComparison, rel_path: &str) -> CompareCategory {
    find(&c.items, rel_path).category
}

fn sides() -> (Arc<MemoryFileSystem>, Arc<MemoryFileSystem>) {
    let mut left = MemoryFileSystem::new("L");
    left.add_file("same.txt", 10, 1000)
        .add_file("newer.txt", 5, 2000)
        .add_file("old.txt", 5, 1000)
        .add_file("left_only.txt", 1, 1000)
        .add_file("conflict.txt", 5, 1000)
        .add_file("dir/inner.txt", 3, 1000)
        .add_file("typeclash", 1, 1000);
    let mut right = MemoryFileSystem::new("R");
    right
        .add_file("same.txt", 10, 1001)
        .add_file("newer.txt", 5, 1000)
        .add_file("old.txt", 5, 2000)
        .add_file("right_only.txt", 1, 1000)
        .add_file("conflict.txt", 6, 1000)
        .add_file("dir/inner.txt", 3, 1000)
        .add_folder("typeclash");
    (Arc::new(left), Arc::new(right))
}

// --- categories ---

#[test]
fn test_categories() {
    let (left, right) = sides();
    let c = compare_one(&left, &right);

    assert_eq!(category_of(&c, "same.txt"), CompareCategory::Equal);
    assert_eq!(category_of(&c, "newer.txt"), CompareCategory::LeftNewer);
    assert_eq!(category_of(&c, "old.txt"), CompareCategory::RightNewer);
    assert_eq!(category_of(&c, "left_only.txt"), CompareCategory::LeftOnly);
    assert_eq!(category_of(&c, "right_only.txt"), CompareCategory::RightOnly);
    assert_eq!(category_of(&c, "conflict.txt"), CompareCategory::Conflict);
    assert_eq!(category_of(&c, "dir"), CompareCategory::Equal);
    assert_eq!(category_of(&c, "dir/inner.txt"), CompareCategory::Equal);

    let clash = find(&c.items, "typeclash");
    assert_eq!(clash.category, CompareCategory::Conflict);
    assert_eq!(
        clash.conflict_reason.as_deref(),
        Some("Items have different types.")
    );
    assert!(find(&c.items, "conflict.txt").conflict_reason.is_some());
}

#[test]
fn test_summary_counts() {
    let (left, right) = sides();
    let c = compare_one(&left, &right);
    let s = &c.summary;
    assert_eq!(s.equal, 3);
    assert_eq!(s.left_only, 1);
    assert_eq!(s.right_only, 1);
    assert_eq!(s.left_newer, 1);
    assert_eq!(s.right_newer, 1);
    assert_eq!(s.conflict, 2);
    assert_eq!(s.inactive, 0);
    assert_eq!(s.differences(), 6);
    assert_eq!(c.differences().len(), 6);
    assert!(c.warnings.is_empty());
}

#[test]
fn test_items_sorted_by_name() {
    let (left, right) = sides();
    let c = compare_one(&left, &right);
    let names: Vec<_> = c.items.iter().map(|n| n.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
}

#[test]
fn test_zero_mtime_window() {
    let (left, right) = sides();
    let pair = FolderPairConfig::new(left.path(""), right.path(""));
    let opts = CompareOptions {
        mtime_window: 0,
        ..Default::default()
    };
    let c = compare(&[pair], &opts).remove(0);
    assert_eq!(category_of(&c, "same.txt"), CompareCategory::RightNewer);
}

#[test]
fn test_symlinks_compared_by_time() {
    let mut left = MemoryFileSystem::new("L");
    left.add_symlink("link", "nowhere", 100);
    let mut right = MemoryFileSystem::new("R");
    right.add_symlink("link", "elsewhere", 300);
    let (left, right) = (Arc::new(left), Arc::new(right));

    let pair = FolderPairConfig::new(left.path(""), right.path(""));
    let opts = CompareOptions {
        handle_symlinks: SymlinkHandling::Direct,
        ..Default::default()
    };
    let c = compare(&[pair], &opts).remove(0);
    assert_eq!(category_of(&c, "link"), CompareCategory::RightNewer);
}

// --- read failures ---

#[test]
fn test_failed_folder_read_turns_one_sided_items_into_conflicts() {
    let (left, _) = sides();
    let mut right = MemoryFileSystem::new("R");
    right
        .add_file("dir/inner.txt", 3, 1000)
        .fail_folder_read("dir", "access denied", usize::MAX);
    let right = Arc::new(right);

    let c = compare_one(&left, &right);
    let inner = find(&c.items, "dir/inner.txt");
    assert_eq!(inner.category, CompareCategory::Conflict);
    assert_eq!(inner.conflict_reason.as_deref(), Some("access denied"));
    // the root listing worked, so root items really are one-sided
    assert_eq!(category_of(&c, "same.txt"), CompareCategory::LeftOnly);

    assert_eq!(c.warnings.len(), 1);
    assert_eq!(c.warnings[0].path, "mem://R/dir");
    assert!(c.warnings[0].is_folder);
}

#[test]
fn test_failed_root_read_marks_everything_conflict() {
    let (left, _) = sides();
    let mut right = MemoryFileSystem::new("R");
    right.fail_folder_read("", "offline", usize::MAX);
    let right = Arc::new(right);

    let c = compare_one(&left, &right);
    assert!(
        c.items
            .iter()
            .all(|n| n.category == CompareCategory::Conflict)
    );
    assert_eq!(c.summary.conflict, c.items.len() + 1);
}

#[test]
fn test_failed_item_read_turns_item_into_conflict() {
    let (left, _) = sides();
    let mut broken = MemoryFileSystem::new("R2");
    broken
        .add_file("same.txt", 10, 1000)
        .fail_item_read("same.txt", "locked", usize::MAX);
    let broken = Arc::new(broken);

    let c = compare_one(&left, &broken);
    let same = find(&c.items, "same.txt");
    assert_eq!(same.category, CompareCategory::Conflict);
    assert_eq!(same.conflict_reason.as_deref(), Some("locked"));
    assert!(!c.warnings[0].is_folder);
}

// --- filters ---

#[test]
fn test_global_filter_applies_to_both_sides() {
    let (left, right) = sides();
    let pair = FolderPairConfig::new(left.path(""), right.path(""));
    let opts = CompareOptions {
        global_filter: FilterConfig::new("*", "*.txt:"),
        ..Default::default()
    };
    let c = compare(&[pair], &opts).remove(0);
    let names: Vec<_> = c.items.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["dir", "typeclash"]);
    assert!(find(&c.items, "dir").children.is_empty());
}

#[test]
fn test_local_filter_combined_with_global() {
    let (left, right) = sides();
    let mut pair = FolderPairConfig::new(left.path(""), right.path(""));
    pair.local_filter = FilterConfig::new("*", "dir/");
    let opts = CompareOptions {
        global_filter: FilterConfig::new("*.txt|dir/", ""),
        ..Default::default()
    };
    let c = compare(&[pair], &opts).remove(0);
    let names: Vec<_> = c.items.iter().map(|n| n.name.as_str()).collect();
    assert!(!names.contains(&"dir"));
    assert!(names.contains(&"same.txt"));
    // right-side folder kept only because "*.txt" files might sit below it
    let clash = find(&c.items, "typeclash");
    assert!(!clash.active);
    assert_eq!(clash.category, CompareCategory::RightOnly);
    assert!(clash.left.is_none());
}

#[test]
fn test_inactive_parent_folders_for_matching_children() {
    let mut left = MemoryFileSystem::new("L");
    left.add_file("a/b/x.txt", 1, 100).add_file("c/y.txt", 1, 100);
    let mut right = MemoryFileSystem::new("R");
    right.add_file("a/b/x.txt", 1, 100).add_file("c/y.txt", 1, 100);
    let (left, right) = (Arc::new(left), Arc::new(right));

    let pair = FolderPairConfig::new(left.path(""), right.path(""));
    let opts = CompareOptions {
        global_filter: FilterConfig::new("a/b/*.txt", ""),
        ..Default::default()
    };
    let c = compare(&[pair], &opts).remove(0);

    assert_eq!(c.items.len(), 1);
    assert!(!find(&c.items, "a").active);
    assert!(!find(&c.items, "a/b").active);
    let x = find(&c.items, "a/b/x.txt");
    assert!(x.active);
    assert_eq!(x.category, CompareCategory::Equal);
    assert_eq!(c.summary.inactive, 2);
    assert_eq!(c.summary.equal, 1);
    assert!(c.differences().is_empty());
}

// --- pairs ---

#[test]
fn test_nested_base_folder_excluded_from_outer() {
    let mut fs = MemoryFileSystem::new("D");
    fs.add_file("top.txt", 1, 100).add_file("sub/x.txt", 1, 100);
    let fs = Arc::new(fs);

    let pair = FolderPairConfig::new(fs.path(""), fs.path("sub"));
    let c = compare(&[pair], &CompareOptions::default()).remove(0);

    let names: Vec<_> = c.items.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["top.txt", "x.txt"]);
    assert_eq!(category_of(&c, "top.txt"), CompareCategory::LeftOnly);
    assert_eq!(category_of(&c, "x.txt"), CompareCategory::RightOnly);
}

#[test]
fn test_nested_base_folder_with_delimiter_in_name() {
    let mut fs = MemoryFileSystem::new("D");
    fs.add_file("Smith/notes.txt", 1, 100).add_file("Smith, John/x.txt", 1, 100);
    let fs = Arc::new(fs);

    let pair = FolderPairConfig::new(fs.path(""), fs.path("Smith, John"));
    let c = compare(&[pair], &CompareOptions::default()).remove(0);

    let mut names: Vec<_> = c.items.iter().map(|n| n.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Smith", "x.txt"]);
    assert_eq!(category_of(&c, "Smith"), CompareCategory::LeftOnly);
    assert_eq!(category_of(&c, "Smith/notes.txt"), CompareCategory::LeftOnly);
}

#[test]
fn test_nested_base_folder_with_wildcard_in_name() {
    let mut fs = MemoryFileSystem::new("D");
    fs.add_file("database/notes.txt", 1, 100).add_file("data*/x.txt", 1, 100);
    let fs = Arc::new(fs);

    let pair = FolderPairConfig::new(fs.path(""), fs.path("data*"));
    let c = compare(&[pair], &CompareOptions::default()).remove(0);

    let mut names: Vec<_> = c.items.iter().map(|n| n.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["database", "x.txt"]);
    assert_eq!(category_of(&c, "database/notes.txt"), CompareCategory::LeftOnly);
}

#[test]
fn test_shared_folder_traversed_once() {
    let (left, right) = sides();
    let pairs = [
        FolderPairConfig::new(left.path(""), right.path("")),
        FolderPairConfig::new(left.path(""), right.path("dir")),
    ];
    let comparisons = compare(&pairs, &CompareOptions::default());

    assert_eq!(comparisons.len(), 2);
    let left_workloads = left.workloads();
    assert_eq!(left_workloads.len(), 1);
    assert_eq!(left_workloads[0].1.len(), 1);
    assert_eq!(right.workloads()[0].1.len(), 2);
    assert_eq!(comparisons[1].right, "mem://R/dir");
}

#[test]
fn test_no_pairs() {
    assert!(compare(&[], &CompareOptions::default()).is_empty());
}

#[test]
fn test_comparison_serializes() {
    let (left, right) = sides();
    let c = compare_one(&left, &right);
    let json = serde_json::to_value(&c).unwrap();
    assert_eq!(json["left"], "mem://L");
    assert_eq!(json["summary"]["conflict"], 2);
    let categories: Vec<_> = json["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["category"].as_str().unwrap().to_string())
        .collect();
    assert!(categories.contains(&"left_only".to_string()));
}

// --- native ---

fn write_file(path: &std::path::Path, content: &[u8], mtime_secs: u64) {
    std::fs::write(path, content).unwrap();
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(mtime_secs))
        .unwrap();
}

#[test]
fn test_compare_dirs_native() {
    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    write_file(&left.path().join("a.txt"), b"same", 1_700_000_000);
    write_file(&right.path().join("a.txt"), b"same", 1_700_000_001);
    write_file(&left.path().join("b.txt"), b"new", 1_700_000_100);
    write_file(&right.path().join("b.txt"), b"old", 1_700_000_000);
    write_file(&right.path().join("c.txt"), b"only", 1_700_000_000);

    let c = syncscan::compare_dirs(left.path(), right.path(), &CompareOptions::default()).unwrap();
    assert_eq!(category_of(&c, "a.txt"), CompareCategory::Equal);
    assert_eq!(category_of(&c, "b.txt"), CompareCategory::LeftNewer);
    assert_eq!(category_of(&c, "c.txt"), CompareCategory::RightOnly);
}
