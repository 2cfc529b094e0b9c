//! In-memory backend for deterministic traversal runs.
//!
//! Supports scripted read failures, a per-item delay to simulate slow devices, and
//! records which thread received which workload plus how many operations ran at once.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

use super::{
    AbstractPath, AfsDevice, AfsPath, FileInfo, FileSystem, FolderInfo, HandleLink, SymlinkInfo,
    TraverserCallback, TraverserWorkload, with_retry,
};
use crate::error::Interrupted;
use crate::pipeline::{InterruptionPoint, WorkQueue};

/// Symlink chains longer than this do not resolve.
const MAX_LINK_HOPS: usize = 8;

#[derive(Clone, Debug)]
enum MemNode {
    File { size: u64, mod_time: i64, id: u64 },
    Folder(BTreeMap<String, MemNode>),
    Symlink { target: AfsPath, mod_time: i64 },
}

#[derive(Debug)]
struct ScriptedFailure {
    msg: String,
    remaining: usize,
}

fn insert_node(root: &mut BTreeMap<String, MemNode>, path: &AfsPath, node: MemNode) {
    let mut segments: Vec<&str> = path.value().split('/').filter(|s| !s.is_empty()).collect();
    let Some(item_name) = segments.pop() else {
        return;
    };
    let mut folder = root;
    for seg in segments {
        let entry = folder
            .entry(seg.to_string())
            .or_insert_with(|| MemNode::Folder(BTreeMap::new()));
        if !matches!(entry, MemNode::Folder(_)) {
            *entry = MemNode::Folder(BTreeMap::new());
        }
        folder = match entry {
            MemNode::Folder(children) => children,
            _ => return,
        };
    }
    // adding a folder twice keeps its children
    let keep_existing = matches!(
        (folder.get(item_name), &node),
        (Some(MemNode::Folder(_)), MemNode::Folder(_))
    );
    if !keep_existing {
        folder.insert(item_name.to_string(), node);
    }
}

#[derive(Debug)]
pub struct MemoryFileSystem {
    name: String,
    root: BTreeMap<String, MemNode>,
    next_id: u64,
    item_delay: Duration,
    folder_failures: Mutex<HashMap<AfsPath, ScriptedFailure>>,
    item_failures: Mutex<HashMap<AfsPath, ScriptedFailure>>,
    workloads: Mutex<Vec<(ThreadId, Vec<AfsPath>)>>,
    active_ops: AtomicUsize,
    peak_ops: AtomicUsize,
}

impl MemoryFileSystem {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            root: BTreeMap::new(),
            next_id: 1,
            item_delay: Duration::ZERO,
            folder_failures: Mutex::new(HashMap::new()),
            item_failures: Mutex::new(HashMap::new()),
            workloads: Mutex::new(Vec::new()),
            active_ops: AtomicUsize::new(0),
            peak_ops: AtomicUsize::new(0),
        }
    }

    /// Insert `node` at `path`, creating missing parent folders.
    fn insert(&mut self, path: &str, node: MemNode) -> &mut Self {
        insert_node(&mut self.root, &AfsPath::new(path), node);
        self
    }

    pub fn add_folder(&mut self, path: &str) -> &mut Self {
        self.insert(path, MemNode::Folder(BTreeMap::new()))
    }

    pub fn add_file(&mut self, path: &str, size: u64, mod_time: i64) -> &mut Self {
        let id = self.next_id;
        self.next_id += 1;
        self.insert(path, MemNode::File { size, mod_time, id })
    }

    /// `target` is a path on this same device.
    pub fn add_symlink(&mut self, path: &str, target: &str, mod_time: i64) -> &mut Self {
        let target = AfsPath::new(target);
        self.insert(path, MemNode::Symlink { target, mod_time })
    }

    /// Listing `path` fails `times` times with `msg` (`usize::MAX` for always).
    pub fn fail_folder_read(&mut self, path: &str, msg: &str, times: usize) -> &mut Self {
        if let Ok(mut failures) = self.folder_failures.lock() {
            failures.insert(
                AfsPath::new(path),
                ScriptedFailure {
                    msg: msg.to_string(),
                    remaining: times,
                },
            );
        }
        self
    }

    /// Reading the item at `path` fails `times` times with `msg`.
    pub fn fail_item_read(&mut self, path: &str, msg: &str, times: usize) -> &mut Self {
        if let Ok(mut failures) = self.item_failures.lock() {
            failures.insert(
                AfsPath::new(path),
                ScriptedFailure {
                    msg: msg.to_string(),
                    remaining: times,
                },
            );
        }
        self
    }

    /// Sleep before every item, to keep traversals running long enough to overlap.
    pub fn set_item_delay(&mut self, delay: Duration) -> &mut Self {
        self.item_delay = delay;
        self
    }

    /// Abstract path of `rel_path` on this device.
    pub fn path(self: &Arc<Self>, rel_path: &str) -> AbstractPath {
        let fs: Arc<dyn FileSystem> = Arc::clone(self) as Arc<dyn FileSystem>;
        AbstractPath::new(AfsDevice::new(fs), AfsPath::new(rel_path))
    }

    /// One entry per `traverse_folder_recursive` call: calling thread and requested folders.
    pub fn workloads(&self) -> Vec<(ThreadId, Vec<AfsPath>)> {
        self.workloads
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    /// Highest number of workload folders traversed at the same time.
    pub fn peak_parallel_ops(&self) -> usize {
        self.peak_ops.load(Ordering::SeqCst)
    }

    fn take_failure(
        failures: &Mutex<HashMap<AfsPath, ScriptedFailure>>,
        path: &AfsPath,
    ) -> Result<(), String> {
        let Ok(mut failures) = failures.lock() else {
            return Ok(());
        };
        match failures.get_mut(path) {
            Some(f) if f.remaining > 0 => {
                f.remaining = f.remaining.saturating_sub(1);
                Err(f.msg.clone())
            }
            _ => Ok(()),
        }
    }

    fn lookup(&self, path: &AfsPath) -> Option<&MemNode> {
        let mut children = &self.root;
        let mut node: Option<&MemNode> = None;
        for seg in path.value().split('/').filter(|s| !s.is_empty()) {
            match node {
                None => {}
                Some(MemNode::Folder(c)) => children = c,
                Some(_) => return None,
            }
            node = Some(children.get(seg)?);
        }
        node
    }

    fn folder_children(&self, path: &AfsPath) -> Result<&BTreeMap<String, MemNode>, String> {
        Self::take_failure(&self.folder_failures, path)?;
        if path.is_root() {
            return Ok(&self.root);
        }
        match self.lookup(path) {
            Some(MemNode::Folder(children)) => Ok(children),
            _ => Err(format!("Cannot find folder '{}'", self.display_path(path))),
        }
    }

    fn resolve_link(&self, target: &AfsPath) -> Result<(AfsPath, &MemNode), String> {
        let mut target = target.clone();
        for _ in 0..MAX_LINK_HOPS {
            match self.lookup(&target) {
                Some(MemNode::Symlink { target: next, .. }) => target = next.clone(),
                Some(node) => return Ok((target, node)),
                None => break,
            }
        }
        Err(format!(
            "Cannot resolve symbolic link target '{}'",
            self.display_path(&target)
        ))
    }

    fn traverse_folder(
        &self,
        cb: &mut dyn TraverserCallback,
        folder_path: &AfsPath,
    ) -> Result<(), Interrupted> {
        let Some(children) = with_retry(
            || self.folder_children(folder_path),
            |msg| msg.clone(),
            |err| cb.report_dir_error(err),
        )?
        else {
            return Ok(());
        };

        for (item_name, node) in children {
            if !self.item_delay.is_zero() {
                thread::sleep(self.item_delay);
            }
            let item_path = folder_path.join(item_name);
            if with_retry(
                || Self::take_failure(&self.item_failures, &item_path),
                |msg| msg.clone(),
                |err| cb.report_item_error(err, item_name),
            )?
            .is_none()
            {
                continue;
            }
            self.visit(cb, item_name, &item_path, node, false)?;
        }
        Ok(())
    }

    fn visit(
        &self,
        cb: &mut dyn TraverserCallback,
        item_name: &str,
        item_path: &AfsPath,
        node: &MemNode,
        is_followed_symlink: bool,
    ) -> Result<(), Interrupted> {
        match node {
            MemNode::File { size, mod_time, id } => cb.on_file(&FileInfo {
                item_name: item_name.to_string(),
                file_size: *size,
                mod_time: *mod_time,
                file_print: *id,
                is_followed_symlink,
            }),
            MemNode::Folder(_) => {
                let folder = FolderInfo {
                    item_name: item_name.to_string(),
                    is_followed_symlink,
                };
                if let Some(mut child) = cb.on_folder(&folder)? {
                    self.traverse_folder(child.as_mut(), item_path)?;
                }
                Ok(())
            }
            MemNode::Symlink { target, mod_time } => {
                let link = SymlinkInfo {
                    item_name: item_name.to_string(),
                    mod_time: *mod_time,
                };
                if cb.on_symlink(&link)? == HandleLink::Skip {
                    return Ok(());
                }
                let Some((target_path, target_node)) = with_retry(
                    || self.resolve_link(target),
                    |msg| msg.clone(),
                    |err| cb.report_item_error(err, item_name),
                )?
                else {
                    return Ok(());
                };
                self.visit(cb, item_name, &target_path, target_node, true)
            }
        }
    }

    fn traverse_workload_item(
        &self,
        folder_path: &AfsPath,
        cb: &mut dyn TraverserCallback,
    ) -> Result<(), Interrupted> {
        let active = self.active_ops.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_ops.fetch_max(active, Ordering::SeqCst);
        let res = self.traverse_folder(cb, folder_path);
        self.active_ops.fetch_sub(1, Ordering::SeqCst);
        res
    }
}

impl FileSystem for MemoryFileSystem {
    fn scheme(&self) -> &str {
        "mem"
    }

    fn device_key(&self) -> &str {
        &self.name
    }

    fn display_path(&self, afs_path: &AfsPath) -> String {
        if afs_path.is_root() {
            format!("mem://{}", self.name)
        } else {
            format!("mem://{}/{}", self.name, afs_path)
        }
    }

    fn traverse_folder_recursive(
        &self,
        workload: TraverserWorkload<'_>,
        parallel_ops: usize,
        interrupt: &InterruptionPoint,
    ) -> Result<(), Interrupted> {
        if let Ok(mut w) = self.workloads.lock() {
            w.push((
                thread::current().id(),
                workload.iter().map(|(p, _)| p.clone()).collect(),
            ));
        }

        let queue = WorkQueue::new();
        for item in workload.into_iter().rev() {
            queue.push(item);
        }
        queue.close();

        let threads = parallel_ops.max(1).min(queue.len().max(1));
        thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    s.spawn(|| -> Result<(), Interrupted> {
                        while let Some((path, mut cb)) = queue.pop(interrupt)? {
                            self.traverse_workload_item(&path, cb.as_mut())?;
                        }
                        Ok(())
                    })
                })
                .collect();
            let mut result = Ok(());
            for h in handles {
                match h.join() {
                    Ok(r) => result = result.and(r),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            result
        })
    }
}
