//! Error types for the traversal core and configuration parsing.
//!
//! Per-item I/O failures are never errors at this level: they travel through the
//! error-report protocol and end up in `DirectoryValue::failed_*_reads`. The only
//! thing that unwinds a traversal is [`Interrupted`].

/// Cooperative cancellation signal.
///
/// Returned from every interruption point (before visiting an item, while blocked
/// on the error-report protocol) and from control-thread callbacks that want to
/// abandon the whole operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation interrupted")]
pub struct Interrupted;

/// Invalid user-supplied configuration value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `--parallel-ops` entry not in `DEVICE=N` form.
    #[error("invalid parallel-ops entry '{0}': expected DEVICE=N")]
    ParallelOpsFormat(String),

    /// `--parallel-ops` count is not a positive integer.
    #[error("invalid parallel-ops count '{count}' for device '{device}'")]
    ParallelOpsCount { device: String, count: String },

    /// Unknown symlink handling mode.
    #[error("unknown symlink mode '{0}': expected exclude, direct or follow")]
    SymlinkMode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_display() {
        assert_eq!(Interrupted.to_string(), "operation interrupted");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ParallelOpsFormat("nas".to_string());
        assert_eq!(
            err.to_string(),
            "invalid parallel-ops entry 'nas': expected DEVICE=N"
        );
    }
}
