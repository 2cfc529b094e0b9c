//! CLI layer: argument parsing, option resolution, output

pub mod arg_parser;
pub mod handlers;
pub mod opts;
pub mod progress;
pub mod tools;

pub use arg_parser::Cli;
pub use handlers::{EXIT_INTERRUPTED, handle_run, resolve_opts};
pub use opts::{ErrorPolicy, RunOpts};
pub use tools::{category_marker, format_difference};
