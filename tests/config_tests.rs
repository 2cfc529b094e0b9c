use clap::Parser;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use syncscan::afs::HandleError;
use syncscan::engine::{Cli, ErrorPolicy, RunOpts, resolve_opts};
use syncscan::error::{ConfigError, Interrupted};
use syncscan::filter::FilterConfig;
use syncscan::pipeline::{
    DeviceParallelOps, cap_parallel_ops, get_device_parallel_ops, parse_parallel_ops_entry,
    set_device_parallel_ops,
};
use syncscan::types::SymlinkHandling;
use syncscan::utils::syncscan_toml::{apply_file_to_opts, parse_syncscan_toml};

// --- parallel ops ---

#[test]
fn test_parse_parallel_ops_entry() {
    assert_eq!(
        parse_parallel_ops_entry("/mnt/nas=4").unwrap(),
        ("/mnt/nas".to_string(), 4)
    );
    assert_eq!(
        parse_parallel_ops_entry(" /mnt/nas/ = 2 ").unwrap(),
        ("/mnt/nas".to_string(), 2)
    );
    assert_eq!(
        parse_parallel_ops_entry("C:\\=3").unwrap(),
        ("C:\\".to_string(), 3)
    );
}

#[test]
fn test_parse_parallel_ops_entry_errors() {
    assert!(matches!(
        parse_parallel_ops_entry("nas"),
        Err(ConfigError::ParallelOpsFormat(_))
    ));
    assert!(matches!(
        parse_parallel_ops_entry("=3"),
        Err(ConfigError::ParallelOpsFormat(_))
    ));
    assert!(matches!(
        parse_parallel_ops_entry("nas=0"),
        Err(ConfigError::ParallelOpsCount { .. })
    ));
    assert!(matches!(
        parse_parallel_ops_entry("nas=many"),
        Err(ConfigError::ParallelOpsCount { .. })
    ));
}

#[test]
fn test_device_parallel_ops_lookup() {
    let mut ops = DeviceParallelOps::new();
    assert_eq!(get_device_parallel_ops(&ops, "/"), 1);

    set_device_parallel_ops(&mut ops, "/mnt/nas/", 4);
    assert_eq!(get_device_parallel_ops(&ops, "/mnt/nas"), 4);
    assert_eq!(get_device_parallel_ops(&ops, "/mnt/other"), 1);

    set_device_parallel_ops(&mut ops, "/mnt/nas", 1);
    assert!(ops.is_empty());
}

#[test]
fn test_cap_parallel_ops_never_zero() {
    assert_eq!(cap_parallel_ops(0, 1), 1);
    assert_eq!(cap_parallel_ops(1, 8), 1);
    assert!(cap_parallel_ops(1000, 1) >= 1);
}

// --- symlink mode ---

#[test]
fn test_symlink_handling_parse() {
    assert_eq!("follow".parse::<SymlinkHandling>().unwrap(), SymlinkHandling::Follow);
    assert_eq!("Direct".parse::<SymlinkHandling>().unwrap(), SymlinkHandling::Direct);
    assert!(matches!(
        "bogus".parse::<SymlinkHandling>(),
        Err(ConfigError::SymlinkMode(_))
    ));
    assert_eq!(SymlinkHandling::default().to_string(), "exclude");
}

// --- .syncscan.toml ---

const SAMPLE_TOML: &str = r#"
[settings]
symlinks = "follow"
mtime_window = 5
list = true
auto_retry = 2

[filter]
include = "*.txt"
exclude = "tmp/"

[parallel_ops]
"/mnt/nas" = 4
"#;

#[test]
fn test_apply_toml_to_opts() {
    let file = parse_syncscan_toml(SAMPLE_TOML).unwrap();
    let mut opts = RunOpts::new("l".into(), "r".into());
    apply_file_to_opts(&file, &mut opts).unwrap();

    assert_eq!(opts.handle_symlinks, SymlinkHandling::Follow);
    assert_eq!(opts.mtime_window, 5);
    assert!(opts.list);
    assert!(!opts.json);
    assert_eq!(opts.policy.auto_retry, 2);
    assert_eq!(opts.filter, FilterConfig::new("*.txt", "tmp/"));
    assert_eq!(get_device_parallel_ops(&opts.device_parallel_ops, "/mnt/nas"), 4);
}

#[test]
fn test_empty_toml_keeps_defaults() {
    let file = parse_syncscan_toml("").unwrap();
    let mut opts = RunOpts::new("l".into(), "r".into());
    apply_file_to_opts(&file, &mut opts).unwrap();
    assert!(opts.filter.is_null());
    assert_eq!(opts.mtime_window, 2);
    assert_eq!(opts.handle_symlinks, SymlinkHandling::Exclude);
}

#[test]
fn test_toml_rejects_unknown_symlink_mode() {
    assert!(parse_syncscan_toml("[settings]\nsymlinks = \"sometimes\"\n").is_err());
}

#[test]
fn test_toml_rejects_zero_parallel_ops() {
    let file = parse_syncscan_toml("[parallel_ops]\n\"/\" = 0\n").unwrap();
    let mut opts = RunOpts::new("l".into(), "r".into());
    assert!(apply_file_to_opts(&file, &mut opts).is_err());
}

// --- CLI resolution ---

#[test]
fn test_cli_overrides_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "[settings]\nmtime_window = 5\nverbose = true\n").unwrap();

    let cli = Cli::try_parse_from([
        "syncscan",
        "left",
        "right",
        "--config",
        config.to_str().unwrap(),
        "--mtime-window",
        "7",
        "--exclude",
        "x/",
        "-p",
        "/mnt/a=3",
        "--symlinks",
        "direct",
        "--list",
    ])
    .unwrap();
    let opts = resolve_opts(&cli).unwrap();

    assert_eq!(opts.mtime_window, 7);
    assert!(opts.verbose);
    assert!(opts.list);
    assert_eq!(opts.filter, FilterConfig::new("*", "x/"));
    assert_eq!(opts.handle_symlinks, SymlinkHandling::Direct);
    assert_eq!(get_device_parallel_ops(&opts.device_parallel_ops, "/mnt/a"), 3);

    let compare = opts.compare_options();
    assert_eq!(compare.mtime_window, 7);
    assert_eq!(compare.global_filter, opts.filter);
}

#[test]
fn test_cli_missing_config_file_is_error() {
    let cli =
        Cli::try_parse_from(["syncscan", "l", "r", "--config", "/nonexistent/x.toml"]).unwrap();
    assert!(resolve_opts(&cli).is_err());
}

#[test]
fn test_cli_bad_parallel_ops_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("empty.toml");
    std::fs::write(&config, "").unwrap();
    let cli = Cli::try_parse_from([
        "syncscan",
        "l",
        "r",
        "--config",
        config.to_str().unwrap(),
        "--parallel-ops",
        "nas",
    ])
    .unwrap();
    assert!(resolve_opts(&cli).is_err());
}

#[test]
fn test_cli_rejects_unknown_symlink_mode() {
    assert!(Cli::try_parse_from(["syncscan", "l", "r", "--symlinks", "maybe"]).is_err());
}

// --- error policy ---

fn policy(auto_retry: usize, ignore_errors: bool) -> ErrorPolicy {
    ErrorPolicy {
        auto_retry,
        retry_delay: Duration::ZERO,
        ignore_errors,
    }
}

#[test]
fn test_error_policy_retries_then_continues() {
    let shutdown = AtomicBool::new(false);
    let p = policy(2, false);
    assert_eq!(p.decide("e", 0, &shutdown), Ok(HandleError::Retry));
    assert_eq!(p.decide("e", 1, &shutdown), Ok(HandleError::Retry));
    assert_eq!(p.decide("e", 2, &shutdown), Ok(HandleError::Continue));
}

#[test]
fn test_error_policy_ignore_errors() {
    let shutdown = AtomicBool::new(false);
    assert_eq!(
        policy(5, true).decide("e", 0, &shutdown),
        Ok(HandleError::Continue)
    );
}

#[test]
fn test_error_policy_shutdown_interrupts() {
    let shutdown = AtomicBool::new(true);
    assert_eq!(policy(0, false).decide("e", 0, &shutdown), Err(Interrupted));
}

// --- logging ---

#[test]
fn test_log_verbosity_can_change_after_setup() {
    syncscan::utils::setup_logging(false);
    assert_eq!(log::max_level(), log::LevelFilter::Info);
    // a verbose config file read after setup turns debug output on
    syncscan::utils::set_log_verbosity(true);
    assert_eq!(log::max_level(), log::LevelFilter::Debug);
    syncscan::utils::set_log_verbosity(false);
    assert_eq!(log::max_level(), log::LevelFilter::Info);
}
