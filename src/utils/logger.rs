use colored::{ColoredString, Colorize};
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Colors for comparison categories in summary and list output.
pub struct Colors;

impl Colors {
    pub const EQUAL: &'static str = "white";
    pub const LEFT: &'static str = "green";
    pub const RIGHT: &'static str = "blue";
    pub const CONFLICT: &'static str = "red";
    pub const SKIPPED: &'static str = "yellow";

    pub fn colorize(color: &str, text: &str) -> ColoredString {
        text.color(color)
    }
}

fn crate_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Install the logger. The crate's own level can be changed later with
/// [`set_log_verbosity`], once the config file has been read.
pub fn setup_logging(verbose: bool) {
    // try_init: tests and library callers may have installed a logger already
    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), LevelFilter::Debug)
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        _ => "ERROR".red(),
                    };
                    let path = record.target().to_string().white();
                    format!("[{} {} {}] {}", name.cyan(), level_str, path, record.args())
                }
                Level::Debug | Level::Trace => {
                    format!("[{} {}] {}", name.cyan(), "DEBUG".dimmed(), record.args())
                }
                Level::Info => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
    set_log_verbosity(verbose);
}

/// Debug output on or off for this crate.
pub fn set_log_verbosity(verbose: bool) {
    log::set_max_level(crate_level(verbose));
}
