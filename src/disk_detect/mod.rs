//! Cross-platform storage device detection.
//!
//! Maps a local path to the mount point holding it (the traversal device) and to a
//! drive type used for parallel-ops hints. The mount list is read once via sysinfo.

use log::debug;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use sysinfo::{Disk, Disks};

// Platform-specific modules
#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

pub mod network;

/// Drive type of a local device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveType {
    SSD,
    HDD,
    Network,
    Unknown,
}

impl DriveType {
    pub fn is_network(&self) -> bool {
        matches!(self, DriveType::Network)
    }

    /// Parallel operations worth suggesting for a device of this type. Local disks
    /// gain nothing from more than one.
    pub fn suggested_parallel_ops(&self) -> usize {
        match self {
            DriveType::Network => 4,
            DriveType::SSD | DriveType::HDD | DriveType::Unknown => 1,
        }
    }
}

static DISKS: OnceLock<Disks> = OnceLock::new();

fn disks() -> &'static Disks {
    DISKS.get_or_init(|| {
        let disks = Disks::new_with_refreshed_list();
        debug!("Available disks:");
        for d in disks.iter() {
            debug!(
                "  mount={}, fs={}, kind={:?}",
                d.mount_point().display(),
                d.file_system().to_string_lossy(),
                d.kind()
            );
        }
        disks
    })
}

/// Disk with the longest mount point containing `path`.
fn disk_for_path(path: &Path) -> Option<&'static Disk> {
    disks()
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
}

/// Mount point holding `path` (absolute). Falls back to the filesystem root of the
/// path when sysinfo knows no matching disk.
pub fn device_root_for(path: &Path) -> PathBuf {
    match disk_for_path(path) {
        Some(disk) => disk.mount_point().to_path_buf(),
        None => {
            debug!("No disk found for path: {}", path.display());
            path.ancestors()
                .last()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| path.to_path_buf())
        }
    }
}

/// Detect drive type for the given path.
pub fn drive_type_for_path(path: &Path) -> DriveType {
    let disk = disk_for_path(path);

    #[cfg(target_os = "macos")]
    {
        macos::detect(path, disk)
    }

    #[cfg(target_os = "linux")]
    {
        linux::detect(path, disk)
    }

    #[cfg(target_os = "windows")]
    {
        windows::detect(path, disk)
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        let _ = disk;
        debug!("Unsupported platform for drive detection");
        DriveType::Unknown
    }
}
