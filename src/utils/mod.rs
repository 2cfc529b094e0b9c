pub mod config;
pub mod fd_limit;
pub mod logger;
pub mod syncscan_toml;

pub use config::*;
pub use fd_limit::{FDS_PER_OPERATION, max_open_fds, max_parallel_ops_by_fd_limit};
pub use logger::{Colors, set_log_verbosity, setup_logging};
