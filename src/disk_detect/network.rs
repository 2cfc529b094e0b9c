/// True if the filesystem type names network storage.
#[inline]
pub fn is_network_fs(fs_type: &str) -> bool {
    let fs = fs_type.to_lowercase();
    ["nfs", "smb", "cifs", "afp", "webdav", "sshfs", "fuse.rclone"]
        .iter()
        .any(|n| fs.contains(n))
}

/// True for UNC-style mount points (`\\server\share`, `//server/share`).
#[inline]
pub fn is_network_mount(mount: &str) -> bool {
    mount.starts_with("\\\\") || mount.starts_with("//")
}
