//! File descriptor limit detection for capping concurrent operations (Unix).

/// Estimated file descriptors held by one traversal operation (open dir handles along
/// the current path plus the entry being read).
pub const FDS_PER_OPERATION: usize = 16;

/// Fraction of the process FD limit to use (leave headroom for other code).
const FD_LIMIT_FRACTION: f64 = 0.8;

/// Returns the soft limit for max open file descriptors, or `None` if unavailable (e.g. Windows).
#[cfg(unix)]
pub fn max_open_fds() -> Option<u64> {
    use std::mem::MaybeUninit;
    let mut rlim = MaybeUninit::<libc::rlimit>::uninit();
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, rlim.as_mut_ptr()) } != 0 {
        return None;
    }
    let rlim = unsafe { rlim.assume_init() };
    let cur = rlim.rlim_cur;
    // RLIM_INFINITY is typically !0 or u64::MAX; treat as "no practical limit"
    if cur == libc::RLIM_INFINITY || cur as u64 > i64::MAX as u64 {
        return None;
    }
    Some(cur as u64)
}

#[cfg(not(unix))]
pub fn max_open_fds() -> Option<u64> {
    None
}

/// Total parallel operations (all devices together) that stay under ~80% of the FD limit.
/// `None` if no limit is available.
pub fn max_parallel_ops_by_fd_limit() -> Option<usize> {
    let limit = max_open_fds()?;
    let usable = (limit as f64 * FD_LIMIT_FRACTION) as usize;
    Some((usable / FDS_PER_OPERATION).max(1))
}
