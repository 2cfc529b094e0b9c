//! Abstract filesystem boundary: device/path algebra and the traversal visitor contract.
//!
//! Backends implement [`FileSystem`]; the traversal core only implements the visitor
//! side ([`TraverserCallback`]).

pub mod memory;
pub mod native;

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::Interrupted;
use crate::pipeline::InterruptionPoint;

pub use memory::MemoryFileSystem;
pub use native::NativeFileSystem;

/// Root-relative path: `/`-separated, no leading or trailing separator, root is `""`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AfsPath(String);

impl AfsPath {
    /// Normalizes `\` to `/` and drops empty segments.
    pub fn new(path: &str) -> Self {
        let segments: Vec<&str> = path
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .collect();
        Self(segments.join("/"))
    }

    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn join(&self, item_name: &str) -> Self {
        if self.0.is_empty() {
            Self::new(item_name)
        } else {
            Self::new(&format!("{}/{}", self.0, item_name))
        }
    }

    /// `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(match self.0.rfind('/') {
            Some(pos) => Self(self.0[..pos].to_string()),
            None => Self::root(),
        })
    }

    pub fn item_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    /// True if `self` equals `other` or lies below it.
    pub fn starts_with(&self, other: &AfsPath) -> bool {
        other.is_root()
            || self.0 == other.0
            || (self.0.starts_with(&other.0) && self.0[other.0.len()..].starts_with('/'))
    }
}

impl fmt::Display for AfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug)]
pub struct FileInfo {
    pub item_name: String,
    pub file_size: u64,
    /// Seconds since the Unix epoch.
    pub mod_time: i64,
    /// Device-unique file id, 0 if the backend has none.
    pub file_print: u64,
    pub is_followed_symlink: bool,
}

#[derive(Clone, Debug)]
pub struct FolderInfo {
    pub item_name: String,
    pub is_followed_symlink: bool,
}

#[derive(Clone, Debug)]
pub struct SymlinkInfo {
    pub item_name: String,
    pub mod_time: i64,
}

#[derive(Clone, Debug)]
pub struct ErrorInfo {
    pub msg: String,
    /// 0 on the first failure, incremented on every retry.
    pub retry_number: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleLink {
    Skip,
    Follow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleError {
    Retry,
    Continue,
}

/// Visitor for one folder level. Backends call it per child item; `on_folder` hands
/// out the visitor for the next level, borrowing this one until it is dropped.
pub trait TraverserCallback: Send {
    fn on_file(&mut self, file: &FileInfo) -> Result<(), Interrupted>;

    /// `None` prunes the subtree.
    fn on_folder(
        &mut self,
        folder: &FolderInfo,
    ) -> Result<Option<Box<dyn TraverserCallback + '_>>, Interrupted>;

    fn on_symlink(&mut self, link: &SymlinkInfo) -> Result<HandleLink, Interrupted>;

    /// The folder this visitor stands for could not be listed.
    fn report_dir_error(&mut self, err: &ErrorInfo) -> Result<HandleError, Interrupted>;

    /// A child item could not be read.
    fn report_item_error(
        &mut self,
        err: &ErrorInfo,
        item_name: &str,
    ) -> Result<HandleError, Interrupted>;
}

/// Folders to traverse on one device, each with its root visitor.
pub type TraverserWorkload<'a> = Vec<(AfsPath, Box<dyn TraverserCallback + 'a>)>;

/// A storage device. Paths on the same device compare by [`AfsPath`] only.
pub trait FileSystem: fmt::Debug + Send + Sync {
    /// Backend family, first component of the device order.
    fn scheme(&self) -> &str;

    /// Identifies the device within its scheme.
    fn device_key(&self) -> &str;

    fn display_path(&self, afs_path: &AfsPath) -> String;

    /// Traverse every workload folder to completion, using at most `parallel_ops`
    /// concurrent operations on this device.
    fn traverse_folder_recursive(
        &self,
        workload: TraverserWorkload<'_>,
        parallel_ops: usize,
        interrupt: &InterruptionPoint,
    ) -> Result<(), Interrupted>;
}

/// Run `op` until it succeeds or the visitor answers Continue (`Ok(None)`).
pub(crate) fn with_retry<T, E>(
    mut op: impl FnMut() -> Result<T, E>,
    mut describe: impl FnMut(&E) -> String,
    mut report: impl FnMut(&ErrorInfo) -> Result<HandleError, Interrupted>,
) -> Result<Option<T>, Interrupted> {
    let mut retry_number = 0;
    loop {
        match op() {
            Ok(v) => return Ok(Some(v)),
            Err(e) => {
                let err = ErrorInfo {
                    msg: describe(&e),
                    retry_number,
                };
                match report(&err)? {
                    HandleError::Retry => retry_number += 1,
                    HandleError::Continue => return Ok(None),
                }
            }
        }
    }
}

/// Shared handle to a [`FileSystem`], ordered by `(scheme, device_key)`.
#[derive(Clone, Debug)]
pub struct AfsDevice(Arc<dyn FileSystem>);

impl AfsDevice {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self(fs)
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.0.as_ref()
    }
}

impl PartialEq for AfsDevice {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AfsDevice {}

impl PartialOrd for AfsDevice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AfsDevice {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.0.scheme(), self.0.device_key()).cmp(&(other.0.scheme(), other.0.device_key()))
    }
}

/// Value-type handle for an item on some device. Ordered by device, then path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct AbstractPath {
    pub device: AfsDevice,
    pub afs_path: AfsPath,
}

impl AbstractPath {
    pub fn new(device: AfsDevice, afs_path: AfsPath) -> Self {
        Self { device, afs_path }
    }

    /// Local path; the device is the mount point holding it.
    pub fn native(path: &Path) -> std::io::Result<Self> {
        NativeFileSystem::abstract_path(path)
    }

    pub fn get_root_path(&self) -> AbstractPath {
        Self::new(self.device.clone(), AfsPath::root())
    }

    pub fn get_root_relative_path(&self) -> &AfsPath {
        &self.afs_path
    }

    pub fn join(&self, rel_path: &str) -> AbstractPath {
        Self::new(self.device.clone(), self.afs_path.join(rel_path))
    }

    pub fn display_path(&self) -> String {
        self.device.fs().display_path(&self.afs_path)
    }
}

impl fmt::Display for AbstractPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_path())
    }
}

/// Total order over abstract paths.
pub fn compare_path(lhs: &AbstractPath, rhs: &AbstractPath) -> Ordering {
    lhs.cmp(rhs)
}
