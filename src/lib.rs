//! syncscan: parallel folder-pair traversal and comparison for a folder-sync engine.
//!
//! Folders are read once per distinct `(symlink handling, path, filter)` request, one
//! worker thread per storage device, while the calling thread answers error prompts
//! and receives status updates. The results are then merged into a two-sided tree
//! with one [`CompareCategory`] per item.

pub mod afs;
pub mod compare;
pub mod disk_detect;
pub mod engine;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use afs::{AbstractPath, AfsPath, HandleError, MemoryFileSystem, NativeFileSystem};
pub use compare::{
    CompareCategory, CompareNode, CompareOptions, CompareSummary, FolderComparison,
    FolderPairConfig, compare_folder_pairs,
};
pub use error::{ConfigError, Interrupted};
pub use filter::{
    DirFilterResult, FilterConfig, FilterRef, NameFilter, PathFilter, construct_filter,
};
pub use pipeline::parallel_device_traversal;

use log::debug;
use std::path::Path;

/// Result alias used by the application-level API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Compare two local folders with `opts`, skipping unreadable items silently.
///
/// Convenience wrapper over [`compare_folder_pairs`] for callers without an error
/// prompt: every read error is answered with Continue and ends up in
/// [`FolderComparison::warnings`].
pub fn compare_dirs(left: &Path, right: &Path, opts: &CompareOptions) -> Result<FolderComparison> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    let pair = FolderPairConfig::new(AbstractPath::native(left)?, AbstractPath::native(right)?);
    let mut comparisons = compare_folder_pairs(
        &[pair],
        opts,
        |_, _| Ok(HandleError::Continue),
        |_, _| Ok(()),
    )?;
    comparisons
        .pop()
        .ok_or_else(|| anyhow::anyhow!("no comparison produced"))
}
