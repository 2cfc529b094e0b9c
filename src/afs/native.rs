//! Local disk backend. One device per mount point; folders are listed one level at a
//! time with walkdir.

use log::debug;
use std::fs::Metadata;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

use super::{
    AbstractPath, AfsDevice, AfsPath, FileInfo, FileSystem, FolderInfo, HandleLink, SymlinkInfo,
    TraverserCallback, TraverserWorkload, with_retry,
};
use crate::disk_detect::device_root_for;
use crate::error::Interrupted;
use crate::pipeline::{InterruptionPoint, WorkQueue};

#[derive(Debug)]
pub struct NativeFileSystem {
    mount_point: PathBuf,
    device_key: String,
}

fn mod_time_secs(meta: &Metadata) -> i64 {
    match meta.modified() {
        Ok(t) => match t.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        },
        Err(_) => 0,
    }
}

#[cfg(unix)]
fn file_print(meta: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
fn file_print(_meta: &Metadata) -> u64 {
    0
}

fn file_info(item_name: &str, meta: &Metadata, is_followed_symlink: bool) -> FileInfo {
    FileInfo {
        item_name: item_name.to_string(),
        file_size: meta.len(),
        mod_time: mod_time_secs(meta),
        file_print: file_print(meta),
        is_followed_symlink,
    }
}

/// Child entries of `dir`, sorted by name. A failure to open the folder itself is the
/// error; unreadable entries come back as `Err` items.
fn list_folder(dir: &Path) -> io::Result<Vec<Result<walkdir::DirEntry, walkdir::Error>>> {
    let mut entries = Vec::new();
    for res in WalkDir::new(dir)
        .min_depth(0)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        match res {
            Ok(entry) if entry.depth() == 0 => {}
            Err(e) if e.depth() == 0 => return Err(e.into()),
            other => entries.push(other),
        }
    }
    Ok(entries)
}

impl NativeFileSystem {
    pub fn new(mount_point: PathBuf) -> Self {
        let device_key = mount_point.display().to_string();
        Self {
            mount_point,
            device_key,
        }
    }

    /// Abstract path for a local path: device is the mount point holding it.
    pub fn abstract_path(path: &Path) -> io::Result<AbstractPath> {
        let path = std::path::absolute(path)?;
        let mount_point = device_root_for(&path);
        let rel = path.strip_prefix(&mount_point).unwrap_or(Path::new(""));
        let segments: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let fs: Arc<dyn FileSystem> = Arc::new(Self::new(mount_point));
        Ok(AbstractPath::new(
            AfsDevice::new(fs),
            AfsPath::new(&segments.join("/")),
        ))
    }

    pub fn native_path(&self, afs_path: &AfsPath) -> PathBuf {
        let mut path = self.mount_point.clone();
        if !afs_path.is_root() {
            path.extend(afs_path.value().split('/'));
        }
        path
    }

    fn traverse_folder(
        &self,
        cb: &mut dyn TraverserCallback,
        dir: &Path,
    ) -> Result<(), Interrupted> {
        let Some(entries) = with_retry(
            || list_folder(dir),
            |e| format!("Cannot read directory '{}': {e}", dir.display()),
            |err| cb.report_dir_error(err),
        )?
        else {
            return Ok(());
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let item_path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let item_name = item_path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    // walkdir yields no entry for it; retrying means a fresh stat
                    let retried = with_retry(
                        || std::fs::symlink_metadata(&item_path),
                        |err| {
                            format!(
                                "Cannot read file attributes of '{}': {err}",
                                item_path.display()
                            )
                        },
                        |err| cb.report_item_error(err, &item_name),
                    )?;
                    if retried.is_some() {
                        self.visit_entry(cb, &item_path, &item_name)?;
                    }
                    continue;
                }
            };
            self.visit_entry(cb, entry.path(), &entry.file_name().to_string_lossy())?;
        }
        Ok(())
    }

    fn visit_entry(
        &self,
        cb: &mut dyn TraverserCallback,
        item_path: &Path,
        item_name: &str,
    ) -> Result<(), Interrupted> {
        let Some(meta) = with_retry(
            || std::fs::symlink_metadata(item_path),
            |e| {
                format!(
                    "Cannot read file attributes of '{}': {e}",
                    item_path.display()
                )
            },
            |err| cb.report_item_error(err, item_name),
        )?
        else {
            return Ok(());
        };

        if meta.file_type().is_symlink() {
            let link = SymlinkInfo {
                item_name: item_name.to_string(),
                mod_time: mod_time_secs(&meta),
            };
            if cb.on_symlink(&link)? == HandleLink::Skip {
                return Ok(());
            }
            let Some(target) = with_retry(
                || std::fs::metadata(item_path),
                |e| {
                    format!(
                        "Cannot resolve symbolic link '{}': {e}",
                        item_path.display()
                    )
                },
                |err| cb.report_item_error(err, item_name),
            )?
            else {
                return Ok(());
            };
            return self.visit_resolved(cb, item_path, item_name, &target, true);
        }
        self.visit_resolved(cb, item_path, item_name, &meta, false)
    }

    fn visit_resolved(
        &self,
        cb: &mut dyn TraverserCallback,
        item_path: &Path,
        item_name: &str,
        meta: &Metadata,
        is_followed_symlink: bool,
    ) -> Result<(), Interrupted> {
        if meta.is_dir() {
            let folder = FolderInfo {
                item_name: item_name.to_string(),
                is_followed_symlink,
            };
            if let Some(mut child) = cb.on_folder(&folder)? {
                self.traverse_folder(child.as_mut(), item_path)?;
            }
            return Ok(());
        }
        cb.on_file(&file_info(item_name, meta, is_followed_symlink))
    }
}

impl FileSystem for NativeFileSystem {
    fn scheme(&self) -> &str {
        "native"
    }

    fn device_key(&self) -> &str {
        &self.device_key
    }

    fn display_path(&self, afs_path: &AfsPath) -> String {
        self.native_path(afs_path).display().to_string()
    }

    fn traverse_folder_recursive(
        &self,
        workload: TraverserWorkload<'_>,
        parallel_ops: usize,
        interrupt: &InterruptionPoint,
    ) -> Result<(), Interrupted> {
        let threads = parallel_ops.max(1).min(workload.len());
        if threads <= 1 {
            for (afs_path, mut cb) in workload {
                interrupt.check()?;
                self.traverse_folder(cb.as_mut(), &self.native_path(&afs_path))?;
            }
            return Ok(());
        }

        debug!(
            "{}: {} folders over {} parallel ops",
            self.device_key,
            workload.len(),
            threads
        );
        let queue = WorkQueue::new();
        // LIFO: push in reverse so folders are taken in request order
        for item in workload.into_iter().rev() {
            queue.push(item);
        }
        queue.close();

        thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    s.spawn(|| -> Result<(), Interrupted> {
                        while let Some((afs_path, mut cb)) = queue.pop(interrupt)? {
                            self.traverse_folder(cb.as_mut(), &self.native_path(&afs_path))?;
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
