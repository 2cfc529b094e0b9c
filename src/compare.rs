//! Comparison stage: traverse both sides of every folder pair, then classify each item.

use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use crate::afs::{AbstractPath, HandleError};
use crate::error::Interrupted;
use crate::filter::{FilterConfig, FilterRef, PathFilter, construct_filter};
use crate::pipeline::{DeviceParallelOps, ReadWarning, parallel_device_traversal, read_warnings};
use crate::types::{
    DirectoryKey, DirectoryValue, FileAttributes, FolderAttributes, FolderContainer,
    LinkAttributes, SymlinkHandling,
};
use crate::utils::config::{CompareConsts, TraversalConsts};

/// Two folders to compare, with the filter phrases local to this pair.
#[derive(Clone, Debug)]
pub struct FolderPairConfig {
    pub left: AbstractPath,
    pub right: AbstractPath,
    pub local_filter: FilterConfig,
}

impl FolderPairConfig {
    pub fn new(left: AbstractPath, right: AbstractPath) -> Self {
        Self {
            left,
            right,
            local_filter: FilterConfig::default(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CompareOptions {
    /// Applied to every pair, ANDed with the pair's own filter.
    pub global_filter: FilterConfig,
    pub handle_symlinks: SymlinkHandling,
    /// Modification times at most this many seconds apart are equal.
    pub mtime_window: i64,
    pub device_parallel_ops: DeviceParallelOps,
    pub poll_interval: Duration,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            global_filter: FilterConfig::default(),
            handle_symlinks: SymlinkHandling::default(),
            mtime_window: CompareConsts::DEFAULT_MTIME_WINDOW_SECS,
            device_parallel_ops: DeviceParallelOps::new(),
            poll_interval: TraversalConsts::POLL_INTERVAL,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareCategory {
    Equal,
    LeftOnly,
    RightOnly,
    LeftNewer,
    RightNewer,
    Conflict,
}

/// Attributes of an item on one side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemAttributes {
    File(FileAttributes),
    Folder(FolderAttributes),
    Symlink(LinkAttributes),
}

/// One item of the unified two-sided hierarchy.
#[derive(Clone, Debug, Serialize)]
pub struct CompareNode {
    pub name: String,
    pub rel_path: String,
    pub left: Option<ItemAttributes>,
    pub right: Option<ItemAttributes>,
    pub category: CompareCategory,
    /// False for folders that do not pass the filter themselves and are only kept
    /// for children that might.
    pub active: bool,
    pub conflict_reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CompareNode>,
}

/// Active item counts per category; inactive folders are counted apart.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CompareSummary {
    pub equal: usize,
    pub left_only: usize,
    pub right_only: usize,
    pub left_newer: usize,
    pub right_newer: usize,
    pub conflict: usize,
    pub inactive: usize,
}

impl CompareSummary {
    fn add(&mut self, node: &CompareNode) {
        if !node.active {
            self.inactive += 1;
        } else {
            match node.category {
                CompareCategory::Equal => self.equal += 1,
                CompareCategory::LeftOnly => self.left_only += 1,
                CompareCategory::RightOnly => self.right_only += 1,
                CompareCategory::LeftNewer => self.left_newer += 1,
                CompareCategory::RightNewer => self.right_newer += 1,
                CompareCategory::Conflict => self.conflict += 1,
            }
        }
        for child in &node.children {
            self.add(child);
        }
    }

    /// Active items that are not equal.
    pub fn differences(&self) -> usize {
        self.left_only + self.right_only + self.left_newer + self.right_newer + self.conflict
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FolderComparison {
    pub left: String,
    pub right: String,
    pub items: Vec<CompareNode>,
    /// Read failures of both sides. Their content is missing, not fatal.
    pub warnings: Vec<ReadWarning>,
    pub summary: CompareSummary,
}

impl FolderComparison {
    /// Active nodes whose category is not `Equal`, depth first.
    pub fn differences(&self) -> Vec<&CompareNode> {
        fn walk<'a>(nodes: &'a [CompareNode], out: &mut Vec<&'a CompareNode>) {
            for node in nodes {
                if node.active && node.category != CompareCategory::Equal {
                    out.push(node);
                }
                walk(&node.children, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.items, &mut out);
        out
    }
}

/// Item on one side, borrowed from the traversal result.
#[derive(Clone, Copy)]
enum SideItem<'a> {
    File(&'a FileAttributes),
    Folder(&'a FolderAttributes, &'a FolderContainer),
    Symlink(&'a LinkAttributes),
}

impl<'a> SideItem<'a> {
    fn attributes(&self) -> ItemAttributes {
        match self {
            SideItem::File(a) => ItemAttributes::File(**a),
            SideItem::Folder(a, _) => ItemAttributes::Folder(**a),
            SideItem::Symlink(a) => ItemAttributes::Symlink(**a),
        }
    }

    fn container(&self) -> Option<&'a FolderContainer> {
        match *self {
            SideItem::Folder(_, cont) => Some(cont),
            _ => None,
        }
    }
}

fn lookup<'a>(cont: Option<&'a FolderContainer>, name: &str) -> Option<SideItem<'a>> {
    let cont = cont?;
    if let Some((attr, sub)) = cont.folders.get(name) {
        return Some(SideItem::Folder(attr, sub));
    }
    if let Some(attr) = cont.files.get(name) {
        return Some(SideItem::File(attr));
    }
    cont.symlinks.get(name).map(SideItem::Symlink)
}

/// One side of a pair during hierarchy building.
struct Side<'a> {
    filter: &'a PathFilter,
    value: &'a DirectoryValue,
}

impl Side<'_> {
    /// Read error that hides whether `rel_path` exists on this side: a failed listing of
    /// one of its ancestor folders, or a failed read of the item or an ancestor.
    fn failed_read_for(&self, rel_path: &str) -> Option<&str> {
        let mut path = rel_path;
        if let Some(msg) = self.value.failed_item_reads.get(path) {
            return Some(msg);
        }
        loop {
            let parent = match path.rfind('/') {
                Some(pos) => &path[..pos],
                None => "",
            };
            if let Some(msg) = self
                .value
                .failed_folder_reads
                .get(parent)
                .or_else(|| self.value.failed_item_reads.get(parent))
            {
                return Some(msg);
            }
            if parent.is_empty() {
                return None;
            }
            path = parent;
        }
    }
}

fn compare_times(left: i64, right: i64, window: i64) -> Option<CompareCategory> {
    let diff = left - right;
    if diff.abs() <= window {
        None
    } else if diff > 0 {
        Some(CompareCategory::LeftNewer)
    } else {
        Some(CompareCategory::RightNewer)
    }
}

fn classify(
    left: Option<SideItem<'_>>,
    right: Option<SideItem<'_>>,
    rel_path: &str,
    sides: &(Side<'_>, Side<'_>),
    mtime_window: i64,
) -> (CompareCategory, Option<String>) {
    match (left, right) {
        (Some(_), None) => match sides.1.failed_read_for(rel_path) {
            Some(msg) => (CompareCategory::Conflict, Some(msg.to_string())),
            None => (CompareCategory::LeftOnly, None),
        },
        (None, Some(_)) => match sides.0.failed_read_for(rel_path) {
            Some(msg) => (CompareCategory::Conflict, Some(msg.to_string())),
            None => (CompareCategory::RightOnly, None),
        },
        (Some(SideItem::File(l)), Some(SideItem::File(r))) => {
            match compare_times(l.mod_time, r.mod_time, mtime_window) {
                Some(category) => (category, None),
                None if l.file_size == r.file_size => (CompareCategory::Equal, None),
                None => (
                    CompareCategory::Conflict,
                    Some("Files have the same modification time but different sizes.".to_string()),
                ),
            }
        }
        (Some(SideItem::Symlink(l)), Some(SideItem::Symlink(r))) => {
            match compare_times(l.mod_time, r.mod_time, mtime_window) {
                Some(category) => (category, None),
                None => (CompareCategory::Equal, None),
            }
        }
        (Some(SideItem::Folder(..)), Some(SideItem::Folder(..))) => (CompareCategory::Equal, None),
        (Some(_), Some(_)) => (
            CompareCategory::Conflict,
            Some("Items have different types.".to_string()),
        ),
        (None, None) => (CompareCategory::Equal, None),
    }
}

fn build_level(
    left: Option<&FolderContainer>,
    right: Option<&FolderContainer>,
    parent_rel_path_pf: &str,
    sides: &(Side<'_>, Side<'_>),
    mtime_window: i64,
) -> Vec<CompareNode> {
    let mut names: BTreeSet<&str> = BTreeSet::new();
    for cont in [left, right].into_iter().flatten() {
        names.extend(cont.folders.keys().map(String::as_str));
        names.extend(cont.files.keys().map(String::as_str));
        names.extend(cont.symlinks.keys().map(String::as_str));
    }

    let mut nodes = Vec::with_capacity(names.len());
    for name in names {
        let rel_path = format!("{parent_rel_path_pf}{name}");
        let l = lookup(left, name);
        let r = lookup(right, name);

        let mut active = true;
        let is_folder = l.and_then(|i| i.container()).is_some()
            || r.and_then(|i| i.container()).is_some();
        if is_folder {
            let results: Vec<_> = [(l, &sides.0), (r, &sides.1)]
                .into_iter()
                .filter(|(item, _)| item.and_then(|i| i.container()).is_some())
                .map(|(_, side)| side.filter.pass_dir_filter(&rel_path))
                .collect();
            if results.iter().all(|res| !res.pass && !res.child_item_might_match) {
                // hard prune: nothing below may show up either
                continue;
            }
            active = results.iter().any(|res| res.pass);
        }

        let (category, conflict_reason) = classify(l, r, &rel_path, sides, mtime_window);
        let children = if is_folder {
            build_level(
                l.and_then(|i| i.container()),
                r.and_then(|i| i.container()),
                &format!("{rel_path}/"),
                sides,
                mtime_window,
            )
        } else {
            Vec::new()
        };
        nodes.push(CompareNode {
            name: name.to_string(),
            rel_path,
            left: l.map(|i| i.attributes()),
            right: r.map(|i| i.attributes()),
            category,
            active,
            conflict_reason,
            children,
        });
    }
    nodes
}

/// Resolved traversal keys of one pair.
struct PairKeys {
    left: DirectoryKey,
    right: DirectoryKey,
}

/// Exclude `inner` from the traversal of `outer` when it is nested inside it on the same device.
fn exclude_nested(outer: &AbstractPath, inner: &AbstractPath, filter: FilterRef) -> FilterRef {
    if outer.device != inner.device
        || outer.afs_path == inner.afs_path
        || !inner.afs_path.starts_with(&outer.afs_path)
    {
        return filter;
    }
    let rel = if outer.afs_path.is_root() {
        inner.afs_path.value()
    } else {
        &inner.afs_path.value()[outer.afs_path.value().len() + 1..]
    };
    debug!("excluding nested base folder '{rel}' from {outer}");
    std::sync::Arc::new(filter.copy_filter_excluding_path(rel))
}

fn pair_keys(pair: &FolderPairConfig, opts: &CompareOptions) -> PairKeys {
    let filter = construct_filter(&opts.global_filter, &pair.local_filter);
    let left_filter = exclude_nested(&pair.left, &pair.right, filter.clone());
    let right_filter = exclude_nested(&pair.right, &pair.left, filter);
    PairKeys {
        left: DirectoryKey::new(pair.left.clone(), left_filter, opts.handle_symlinks),
        right: DirectoryKey::new(pair.right.clone(), right_filter, opts.handle_symlinks),
    }
}

fn build_comparison(
    keys: &PairKeys,
    output: &BTreeMap<DirectoryKey, DirectoryValue>,
    mtime_window: i64,
) -> Option<FolderComparison> {
    let left_value = output.get(&keys.left)?;
    let right_value = output.get(&keys.right)?;
    let sides = (
        Side {
            filter: &keys.left.filter,
            value: left_value,
        },
        Side {
            filter: &keys.right.filter,
            value: right_value,
        },
    );
    let items = build_level(
        Some(&left_value.folder_cont),
        Some(&right_value.folder_cont),
        "",
        &sides,
        mtime_window,
    );

    let mut summary = CompareSummary::default();
    for node in &items {
        summary.add(node);
    }
    let mut warnings = read_warnings(&keys.left, left_value);
    if keys.right != keys.left {
        warnings.extend(read_warnings(&keys.right, right_value));
    }

    Some(FolderComparison {
        left: keys.left.folder_path.display_path(),
        right: keys.right.folder_path.display_path(),
        items,
        warnings,
        summary,
    })
}

/// Compare every folder pair. All folders are traversed in one
/// [`parallel_device_traversal`] call, then the pairs are classified in parallel.
///
/// Returns `Err(Interrupted)` only when one of the callbacks asked to abort.
pub fn compare_folder_pairs<E, S>(
    pairs: &[FolderPairConfig],
    opts: &CompareOptions,
    on_error: E,
    on_status_update: S,
) -> Result<Vec<FolderComparison>, Interrupted>
where
    E: FnMut(&str, usize) -> Result<HandleError, Interrupted>,
    S: FnMut(&str, usize) -> Result<(), Interrupted>,
{
    let keys: Vec<PairKeys> = pairs.iter().map(|p| pair_keys(p, opts)).collect();
    let folders_to_read: BTreeSet<DirectoryKey> = keys
        .iter()
        .flat_map(|k| [k.left.clone(), k.right.clone()])
        .collect();

    let output = parallel_device_traversal(
        &folders_to_read,
        &opts.device_parallel_ops,
        on_error,
        on_status_update,
        opts.poll_interval,
    )?;

    let started = Instant::now();
    let comparisons: Vec<FolderComparison> = keys
        .par_iter()
        .filter_map(|k| build_comparison(k, &output, opts.mtime_window))
        .collect();
    info!(
        "Compared {} folder pairs in {:.2?}",
        comparisons.len(),
        started.elapsed()
    );
    Ok(comparisons)
}
