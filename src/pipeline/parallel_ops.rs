//! Per-device parallel operation overrides.

use log::debug;
use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::utils::config::TraversalConsts;
use crate::utils::fd_limit::max_parallel_ops_by_fd_limit;

/// Device root display path -> parallel operations. Devices not listed use the default.
pub type DeviceParallelOps = BTreeMap<String, usize>;

fn normalize_device_path(device_path: &str) -> String {
    let trimmed = device_path.trim();
    let stripped = trimmed.trim_end_matches(['/', '\\']);
    // keep "/" and "C:\" style roots intact
    if stripped.is_empty() || stripped.ends_with(':') {
        trimmed.to_string()
    } else {
        stripped.to_string()
    }
}

/// Configured count for `device_path`, never below 1.
pub fn get_device_parallel_ops(config: &DeviceParallelOps, device_path: &str) -> usize {
    config
        .get(&normalize_device_path(device_path))
        .copied()
        .unwrap_or(TraversalConsts::DEFAULT_PARALLEL_OPS)
        .max(1)
}

/// Counts of 1 or less remove the override.
pub fn set_device_parallel_ops(config: &mut DeviceParallelOps, device_path: &str, count: usize) {
    let key = normalize_device_path(device_path);
    if count <= 1 {
        config.remove(&key);
    } else {
        config.insert(key, count);
    }
}

/// Clamp a requested count so that all devices together stay below the FD limit.
pub fn cap_parallel_ops(requested: usize, device_count: usize) -> usize {
    let capped = match max_parallel_ops_by_fd_limit() {
        Some(max_total) => {
            let per_device = (max_total / device_count.max(1)).max(1);
            if requested > per_device {
                debug!("parallel ops {requested} capped to {per_device} by FD limit");
            }
            requested.min(per_device)
        }
        None => requested,
    };
    capped.max(1)
}

/// Parse one `DEVICE=N` entry.
pub fn parse_parallel_ops_entry(entry: &str) -> Result<(String, usize), ConfigError> {
    let (device, count) = entry
        .rsplit_once('=')
        .ok_or_else(|| ConfigError::ParallelOpsFormat(entry.to_string()))?;
    let device = device.trim();
    if device.is_empty() {
        return Err(ConfigError::ParallelOpsFormat(entry.to_string()));
    }
    let count: usize = count
        .trim()
        .parse()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| ConfigError::ParallelOpsCount {
            device: device.to_string(),
            count: count.trim().to_string(),
        })?;
    Ok((normalize_device_path(device), count))
}
