//! Linux drive type detection using sysinfo and /sys/block

use super::DriveType;
use super::network::is_network_fs;
use log::debug;
use std::path::Path;
use sysinfo::{Disk, DiskKind};

pub fn detect(path: &Path, disk: Option<&Disk>) -> DriveType {
    let Some(disk) = disk else {
        return DriveType::Unknown;
    };
    let fs_type = disk.file_system().to_string_lossy();
    debug!(
        "{} lives on {} ({fs_type}, {:?})",
        path.display(),
        disk.mount_point().display(),
        disk.kind()
    );

    if is_network_fs(&fs_type) {
        return DriveType::Network;
    }
    match disk.kind() {
        DiskKind::HDD => DriveType::HDD,
        DiskKind::SSD => DriveType::SSD,
        DiskKind::Unknown(_) => match spins(disk) {
            Some(true) => DriveType::HDD,
            _ => DriveType::SSD,
        },
    }
}

/// `/sys/block/<dev>/queue/rotational` of the block device backing `disk`.
fn spins(disk: &Disk) -> Option<bool> {
    let dev = disk.name().to_str()?.strip_prefix("/dev/")?;
    // partition -> whole device: sda1 -> sda, nvme0n1p1 -> nvme0n1
    let block = match dev.strip_prefix("nvme") {
        Some(_) => dev.split('p').next().unwrap_or(dev),
        None => dev.trim_end_matches(char::is_numeric),
    };
    let flag = std::fs::read_to_string(format!("/sys/block/{block}/queue/rotational")).ok()?;
    Some(flag.trim() == "1")
}
