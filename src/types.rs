//! Traversal keys, results and the in-memory folder tree.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::afs::AbstractPath;
use crate::error::ConfigError;
use crate::filter::FilterRef;

/// What to do with symbolic links met during traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymlinkHandling {
    /// Ignore links entirely.
    #[default]
    Exclude,
    /// Record the link itself, never its target.
    Direct,
    /// Resolve the link and treat the target as file or folder.
    Follow,
}

impl FromStr for SymlinkHandling {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exclude" => Ok(Self::Exclude),
            "direct" => Ok(Self::Direct),
            "follow" => Ok(Self::Follow),
            _ => Err(ConfigError::SymlinkMode(s.to_string())),
        }
    }
}

impl fmt::Display for SymlinkHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Exclude => "exclude",
            Self::Direct => "direct",
            Self::Follow => "follow",
        };
        f.write_str(s)
    }
}

/// One traversal request. Field order gives the key order: symlink handling, then
/// path, then filter.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirectoryKey {
    pub handle_symlinks: SymlinkHandling,
    pub folder_path: AbstractPath,
    pub filter: FilterRef,
}

impl DirectoryKey {
    pub fn new(
        folder_path: AbstractPath,
        filter: FilterRef,
        handle_symlinks: SymlinkHandling,
    ) -> Self {
        Self {
            handle_symlinks,
            folder_path,
            filter,
        }
    }
}

/// Traversal result for one [`DirectoryKey`].
///
/// Failed reads are keyed by root-relative path: folder errors by the folder's own
/// path (root is `""`), item errors by the item's path.
#[derive(Clone, Debug, Default)]
pub struct DirectoryValue {
    pub folder_cont: FolderContainer,
    pub failed_folder_reads: BTreeMap<String, String>,
    pub failed_item_reads: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttributes {
    /// Seconds since the Unix epoch.
    pub mod_time: i64,
    pub file_size: u64,
    /// Device-unique file id (inode on Unix), 0 if unknown.
    pub file_print: u64,
    pub is_followed_symlink: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderAttributes {
    pub is_followed_symlink: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAttributes {
    pub mod_time: i64,
}

/// Recursive folder tree built by exactly one writer per subtree.
#[derive(Clone, Debug, Default)]
pub struct FolderContainer {
    pub files: BTreeMap<String, FileAttributes>,
    pub folders: BTreeMap<String, (FolderAttributes, FolderContainer)>,
    pub symlinks: BTreeMap<String, LinkAttributes>,
}

impl FolderContainer {
    pub fn add_file(&mut self, item_name: &str, attr: FileAttributes) {
        self.files.insert(item_name.to_string(), attr);
    }

    /// Insert (or reuse) the child folder and hand out its container.
    pub fn add_folder(&mut self, item_name: &str, attr: FolderAttributes) -> &mut FolderContainer {
        let entry = self
            .folders
            .entry(item_name.to_string())
            .or_insert_with(|| (attr, FolderContainer::default()));
        entry.0 = attr;
        &mut entry.1
    }

    pub fn add_link(&mut self, item_name: &str, attr: LinkAttributes) {
        self.symlinks.insert(item_name.to_string(), attr);
    }

    /// Items in this subtree, all levels included.
    pub fn item_count(&self) -> usize {
        self.files.len()
            + self.symlinks.len()
            + self
                .folders
                .values()
                .map(|(_, sub)| 1 + sub.item_count())
                .sum::<usize>()
    }
}
