use clap::Parser;
use std::path::PathBuf;

use crate::types::SymlinkHandling;

/// Compare two folder trees and report what differs.
#[derive(Clone, Parser)]
#[command(name = "syncscan")]
#[command(about = "Compare two folder trees and report which side is newer for every item.")]
pub struct Cli {
    /// Left base folder.
    #[arg(value_name = "LEFT")]
    pub left: PathBuf,

    /// Right base folder.
    #[arg(value_name = "RIGHT")]
    pub right: PathBuf,

    /// Include phrase: masks separated by `|`, `,` or newline. Default: `*`.
    #[arg(long, short = 'i')]
    pub include: Option<String>,

    /// Exclude phrase, same syntax as --include. A trailing `/` matches folders only,
    /// a trailing `:` files only.
    #[arg(long, short = 'e')]
    pub exclude: Option<String>,

    /// Symbolic links: exclude, direct or follow.
    #[arg(long, short = 's')]
    pub symlinks: Option<SymlinkHandling>,

    /// Parallel operations for one device, as DEVICE=N. Repeatable.
    #[arg(long, short = 'p', value_name = "DEVICE=N")]
    pub parallel_ops: Vec<String>,

    /// Mtime tolerance window in seconds. Files within this window are considered equal.
    #[arg(long, short = 'm', value_parser = clap::value_parser!(i64))]
    pub mtime_window: Option<i64>,

    /// Retry failed reads this many times before skipping them.
    #[arg(long, short = 'r')]
    pub auto_retry: Option<usize>,

    /// Skip unreadable folders and items without retrying or warning.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub ignore_errors: Option<bool>,

    /// List each differing path. If there are more than the threshold, write them to syncscan.results instead of stdout.
    #[arg(long, short = 'l', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub list: Option<bool>,

    /// Print the full comparison as JSON.
    #[arg(long, short = 'j', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub json: Option<bool>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Config file. Default: `.syncscan.toml` in the current directory, if present.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}
