use serde::Serialize;

use crate::types::{DirectoryKey, DirectoryValue};

/// One recorded read failure, shown to the user as a warning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReadWarning {
    /// Display path of the folder or item that failed.
    pub path: String,
    pub msg: String,
    pub is_folder: bool,
}

/// Warnings for the failed reads of one traversal result, folders first.
pub fn read_warnings(key: &DirectoryKey, value: &DirectoryValue) -> Vec<ReadWarning> {
    let folders = value.failed_folder_reads.iter().map(|r| (r, true));
    let items = value.failed_item_reads.iter().map(|r| (r, false));
    folders
        .chain(items)
        .map(|((rel_path, msg), is_folder)| ReadWarning {
            path: key.folder_path.join(rel_path).display_path(),
            msg: msg.clone(),
            is_folder,
        })
        .collect()
}

/// Log a summary of read failures; list each one when verbose.
pub fn log_read_errors(warnings: &[ReadWarning], verbose: bool) {
    if warnings.is_empty() {
        return;
    }
    log::warn!(
        "Skipped {} unreadable folders or items; their content is missing from the comparison",
        warnings.len()
    );
    if verbose {
        for w in warnings {
            eprintln!("  skipped: {} ({})", w.path, w.msg);
        }
    }
}
