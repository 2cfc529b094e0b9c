//! Resolved run options: defaults, then `.syncscan.toml`, then CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use crate::compare::CompareOptions;
use crate::filter::FilterConfig;
use crate::pipeline::DeviceParallelOps;
use crate::types::SymlinkHandling;
use crate::utils::config::{CompareConsts, RetryConsts, TraversalConsts};

/// How the CLI answers traversal errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorPolicy {
    /// Retries before an error is recorded and skipped.
    pub auto_retry: usize,
    pub retry_delay: Duration,
    /// Skip without retrying or warning.
    pub ignore_errors: bool,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self {
            auto_retry: RetryConsts::DEFAULT_AUTO_RETRY,
            retry_delay: RetryConsts::RETRY_DELAY,
            ignore_errors: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RunOpts {
    pub left: PathBuf,
    pub right: PathBuf,
    pub filter: FilterConfig,
    pub handle_symlinks: SymlinkHandling,
    pub mtime_window: i64,
    pub device_parallel_ops: DeviceParallelOps,
    pub policy: ErrorPolicy,
    pub verbose: bool,
    pub list: bool,
    pub json: bool,
}

impl RunOpts {
    pub fn new(left: PathBuf, right: PathBuf) -> Self {
        Self {
            left,
            right,
            filter: FilterConfig::default(),
            handle_symlinks: SymlinkHandling::default(),
            mtime_window: CompareConsts::DEFAULT_MTIME_WINDOW_SECS,
            device_parallel_ops: DeviceParallelOps::new(),
            policy: ErrorPolicy::default(),
            verbose: false,
            list: false,
            json: false,
        }
    }

    pub fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            global_filter: self.filter.clone(),
            handle_symlinks: self.handle_symlinks,
            mtime_window: self.mtime_window,
            device_parallel_ops: self.device_parallel_ops.clone(),
            poll_interval: TraversalConsts::POLL_INTERVAL,
        }
    }
}
