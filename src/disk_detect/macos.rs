//! macOS drive type detection using statfs, sysinfo as fallback

use super::DriveType;
use super::network::is_network_fs;
use log::debug;
use std::ffi::CString;
use std::mem::MaybeUninit;
use std::path::Path;
use sysinfo::Disk;

/// Filesystem type name reported by statfs, e.g. "smbfs" or "apfs".
fn statfs_type(path: &Path) -> Option<String> {
    let path_cstr = CString::new(path.to_string_lossy().as_bytes()).ok()?;
    unsafe {
        let mut stat: MaybeUninit<libc::statfs> = MaybeUninit::uninit();
        if libc::statfs(path_cstr.as_ptr(), stat.as_mut_ptr()) != 0 {
            return None;
        }
        let stat = stat.assume_init();
        Some(
            std::ffi::CStr::from_ptr(stat.f_fstypename.as_ptr())
                .to_string_lossy()
                .into_owned(),
        )
    }
}

pub fn detect(path: &Path, disk: Option<&Disk>) -> DriveType {
    // statfs sees SMB/NFS/AFP mounts that sysinfo does not list
    if let Some(fs_type) = statfs_type(path) {
        debug!("macOS statfs: path={}, fs_type={}", path.display(), fs_type);
        if is_network_fs(&fs_type) {
            return DriveType::Network;
        }
    }

    let Some(disk) = disk else {
        return DriveType::Unknown;
    };
    if is_network_fs(&disk.file_system().to_string_lossy()) {
        return DriveType::Network;
    }
    match disk.kind() {
        sysinfo::DiskKind::HDD => DriveType::HDD,
        sysinfo::DiskKind::SSD | sysinfo::DiskKind::Unknown(_) => DriveType::SSD,
    }
}
