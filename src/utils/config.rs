//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived paths: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    results_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache paths from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                results_filename: format!("{pkg}.results"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Config file looked up in the current directory when `--config` is not given.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    pub fn results_filename(&self) -> &str {
        &self.results_filename
    }
}

// ---- Traversal ----

/// Worker/control protocol timing and structural guards.
pub struct TraversalConsts;

impl TraversalConsts {
    /// Minimum time between two status-line reports of the designated worker.
    pub const CALLBACK_INTERVAL: Duration = Duration::from_millis(50);
    /// Control-thread wake-up period for status updates.
    pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
    /// Deepest visitor level before "Endless recursion." is reported instead of descending.
    pub const MAX_FOLDER_DEPTH: usize = 100;
    /// Parallel operations per device when the user configured none.
    pub const DEFAULT_PARALLEL_OPS: usize = 1;
}

// ---- Comparison ----

pub struct CompareConsts;

impl CompareConsts {
    /// Modification times closer than this count as equal (FAT stores 2 s resolution).
    pub const DEFAULT_MTIME_WINDOW_SECS: i64 = 2;
}

// ---- Error policy ----

/// CLI retry behavior for traversal errors.
pub struct RetryConsts;

impl RetryConsts {
    pub const DEFAULT_AUTO_RETRY: usize = 0;
    pub const RETRY_DELAY: Duration = Duration::from_secs(1);
}

// ---- List output ----

/// When --list is set and more items differ than this, paths go to RESULTS_FILENAME
/// instead of stdout.
pub const LIST_THRESHOLD: usize = 100;
