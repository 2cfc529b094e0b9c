//! Windows drive type detection using sysinfo (WMI)

use super::DriveType;
use super::network::{is_network_fs, is_network_mount};
use log::debug;
use std::path::Path;
use sysinfo::Disk;

pub fn detect(path: &Path, disk: Option<&Disk>) -> DriveType {
    // UNC paths never show up as a sysinfo disk
    if is_network_mount(&path.to_string_lossy()) {
        return DriveType::Network;
    }
    let Some(disk) = disk else {
        return DriveType::Unknown;
    };

    let fs_type = disk.file_system().to_string_lossy();
    let mount_point = disk.mount_point().to_string_lossy();
    debug!(
        "Disk detection: path={}, mount={}, fs_type={}, kind={:?}",
        path.display(),
        mount_point,
        fs_type,
        disk.kind()
    );

    if is_network_fs(&fs_type) || is_network_mount(&mount_point) {
        return DriveType::Network;
    }
    match disk.kind() {
        sysinfo::DiskKind::HDD => DriveType::HDD,
        sysinfo::DiskKind::SSD => DriveType::SSD,
        // WMI reports Unknown for removable/virtual/NVMe
        sysinfo::DiskKind::Unknown(_) => DriveType::Unknown,
    }
}
