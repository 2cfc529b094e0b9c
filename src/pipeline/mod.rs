//! Traversal pipeline: worker/control actor, per-folder visitor, per-device dispatcher.

pub mod async_callback;
pub mod dir_callback;
pub mod error_handler;
pub mod interrupt;
pub mod orchestrator;
pub mod parallel_ops;
pub mod work_queue;

pub use async_callback::{AsyncCallback, ErrorRequest};
pub use dir_callback::{DirCallback, FailedReads, TraverserConfig};
pub use error_handler::{ReadWarning, log_read_errors, read_warnings};
pub use interrupt::{InterruptionPoint, Interrupter, interruption_pair};
pub use orchestrator::parallel_device_traversal;
pub use parallel_ops::{
    DeviceParallelOps, cap_parallel_ops, get_device_parallel_ops, parse_parallel_ops_entry,
    set_device_parallel_ops,
};
pub use work_queue::WorkQueue;
