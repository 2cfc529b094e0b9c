//! Load `.syncscan.toml` (CLI only). Library callers pass `CompareOptions` directly.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::engine::RunOpts;
use crate::error::ConfigError;
use crate::pipeline::set_device_parallel_ops;
use crate::types::SymlinkHandling;

#[derive(Debug, Default, Deserialize)]
pub struct SyncscanToml {
    #[serde(default)]
    settings: SettingsSection,
    #[serde(default)]
    filter: FilterSection,
    /// Device root -> parallel operations.
    #[serde(default)]
    parallel_ops: BTreeMap<String, usize>,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    symlinks: Option<SymlinkHandling>,
    mtime_window: Option<i64>,
    verbose: Option<bool>,
    list: Option<bool>,
    json: Option<bool>,
    auto_retry: Option<usize>,
    ignore_errors: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct FilterSection {
    include: Option<String>,
    exclude: Option<String>,
}

pub fn parse_syncscan_toml(s: &str) -> Result<SyncscanToml, toml::de::Error> {
    toml::from_str(s)
}

/// Read an explicitly requested config file. Missing or malformed files are errors.
pub fn read_syncscan_toml(path: &Path) -> Result<SyncscanToml> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    parse_syncscan_toml(&s).with_context(|| format!("parse config file {}", path.display()))
}

/// Load `.syncscan.toml` from `dir` if present. Returns None if missing or unreadable.
pub fn load_syncscan_toml(dir: &Path) -> Option<SyncscanToml> {
    let path = dir.join(crate::utils::PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_syncscan_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $($opts_field:ident).+) => {
        if let Some(v) = $sec.$sec_field.clone() {
            $opts.$($opts_field).+ = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI.
pub fn apply_file_to_opts(file: &SyncscanToml, opts: &mut RunOpts) -> Result<(), ConfigError> {
    let s = &file.settings;
    apply_file_opt!(s, opts, symlinks => handle_symlinks);
    apply_file_opt!(s, opts, mtime_window => mtime_window);
    apply_file_opt!(s, opts, verbose => verbose);
    apply_file_opt!(s, opts, list => list);
    apply_file_opt!(s, opts, json => json);
    apply_file_opt!(s, opts, auto_retry => policy.auto_retry);
    apply_file_opt!(s, opts, ignore_errors => policy.ignore_errors);

    let f = &file.filter;
    apply_file_opt!(f, opts, include => filter.include);
    apply_file_opt!(f, opts, exclude => filter.exclude);

    for (device, &count) in &file.parallel_ops {
        if count == 0 {
            return Err(ConfigError::ParallelOpsCount {
                device: device.clone(),
                count: count.to_string(),
            });
        }
        set_device_parallel_ops(&mut opts.device_parallel_ops, device, count);
    }
    Ok(())
}
