//! CLI command handler: resolve options, compare, report.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::afs::{AbstractPath, HandleError};
use crate::compare::{FolderPairConfig, compare_folder_pairs};
use crate::engine::arg_parser::Cli;
use crate::engine::opts::{ErrorPolicy, RunOpts};
use crate::engine::progress::{create_counter, finish_counter, update_counter};
use crate::engine::tools::{log_drive_hints, report_comparison};
use crate::error::Interrupted;
use crate::pipeline::{log_read_errors, parse_parallel_ops_entry, set_device_parallel_ops};
use crate::utils::PackagePaths;
use crate::utils::{set_log_verbosity, setup_logging};
use crate::utils::syncscan_toml::{apply_file_to_opts, load_syncscan_toml, read_syncscan_toml};

/// Exit code for runs cancelled by the user or an error prompt.
pub const EXIT_INTERRUPTED: i32 = 130;

impl ErrorPolicy {
    /// Answer one error prompt: retry with a delay while retries remain, then skip.
    pub fn decide(
        &self,
        msg: &str,
        retry_number: usize,
        shutdown: &AtomicBool,
    ) -> Result<HandleError, Interrupted> {
        if shutdown.load(Ordering::Relaxed) {
            return Err(Interrupted);
        }
        if self.ignore_errors {
            debug!("ignored: {msg}");
            return Ok(HandleError::Continue);
        }
        if retry_number < self.auto_retry {
            warn!("{msg} (retry {}/{})", retry_number + 1, self.auto_retry);
            sleep_unless_shutdown(self.retry_delay, shutdown)?;
            return Ok(HandleError::Retry);
        }
        warn!("{msg}");
        Ok(HandleError::Continue)
    }
}

fn sleep_unless_shutdown(delay: Duration, shutdown: &AtomicBool) -> Result<(), Interrupted> {
    const STEP: Duration = Duration::from_millis(50);
    let mut left = delay;
    while !left.is_zero() {
        if shutdown.load(Ordering::Relaxed) {
            return Err(Interrupted);
        }
        let step = left.min(STEP);
        std::thread::sleep(step);
        left -= step;
    }
    Ok(())
}

/// Defaults, then the config file, then CLI flags.
pub fn resolve_opts(cli: &Cli) -> Result<RunOpts> {
    let mut opts = RunOpts::new(cli.left.clone(), cli.right.clone());

    let file = match &cli.config {
        Some(path) => Some(read_syncscan_toml(path)?),
        None => std::env::current_dir()
            .ok()
            .and_then(|dir| load_syncscan_toml(&dir)),
    };
    if let Some(file) = &file {
        apply_file_to_opts(file, &mut opts).with_context(|| {
            format!("invalid {}", PackagePaths::get().config_filename())
        })?;
    }

    if let Some(v) = &cli.include {
        opts.filter.include = v.clone();
    }
    if let Some(v) = &cli.exclude {
        opts.filter.exclude = v.clone();
    }
    if let Some(v) = cli.symlinks {
        opts.handle_symlinks = v;
    }
    for entry in &cli.parallel_ops {
        let (device, count) = parse_parallel_ops_entry(entry)?;
        set_device_parallel_ops(&mut opts.device_parallel_ops, &device, count);
    }
    if let Some(v) = cli.mtime_window {
        opts.mtime_window = v;
    }
    if let Some(v) = cli.auto_retry {
        opts.policy.auto_retry = v;
    }
    if let Some(v) = cli.ignore_errors {
        opts.policy.ignore_errors = v;
    }
    if let Some(v) = cli.list {
        opts.list = v;
    }
    if let Some(v) = cli.json {
        opts.json = v;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    Ok(opts)
}

fn install_shutdown_handler() -> Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;
    Ok(shutdown)
}

/// Compare LEFT with RIGHT and print the result. Exits with 130 when interrupted.
pub fn handle_run(cli: &Cli) -> Result<()> {
    // before resolving, so a malformed config file still gets its warning out
    setup_logging(cli.verbose.unwrap_or(false));
    let opts = resolve_opts(cli)?;
    set_log_verbosity(opts.verbose);
    debug!(
        "{} CONFIG:{:#?}",
        PackagePaths::get().pkg_name().to_uppercase(),
        opts
    );

    let left = AbstractPath::native(&opts.left)
        .with_context(|| format!("resolve {}", opts.left.display()))?;
    let right = AbstractPath::native(&opts.right)
        .with_context(|| format!("resolve {}", opts.right.display()))?;
    log_drive_hints(&opts);

    let shutdown = install_shutdown_handler()?;
    let counter = opts.verbose.then(|| create_counter("Scanning"));
    let pair = FolderPairConfig::new(left, right);

    let result = compare_folder_pairs(
        &[pair],
        &opts.compare_options(),
        |msg, retry_number| opts.policy.decide(msg, retry_number, &shutdown),
        |status, items_scanned| {
            if shutdown.load(Ordering::Relaxed) {
                return Err(Interrupted);
            }
            match &counter {
                Some(bar) => update_counter(bar, items_scanned),
                None => debug!("{status}"),
            }
            Ok(())
        },
    );
    if let Some(bar) = &counter {
        finish_counter(bar);
    }

    match result {
        Ok(comparisons) => {
            for comparison in &comparisons {
                log_read_errors(&comparison.warnings, opts.verbose);
                report_comparison(comparison, &opts)?;
            }
            Ok(())
        }
        Err(Interrupted) => {
            warn!("Comparison interrupted; no results were produced.");
            std::process::exit(EXIT_INTERRUPTED);
        }
    }
}
