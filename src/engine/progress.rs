//! Counter bar for the scan phase

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

pub type ProgressBar = Arc<Mutex<Bar>>;

/// Create a counter for unknown total (shows count without percentage)
pub fn create_counter(desc: &'static str) -> ProgressBar {
    let bar = Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " items"
    )));
    refresh_bar(&bar);
    bar
}

/// Force a refresh of the bar (e.g. so counter shows "0 items" immediately).
pub fn refresh_bar(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.refresh();
    }
}

/// Move the counter to `items_scanned`. Skips the update if the lock is contended.
pub fn update_counter(pb: &ProgressBar, items_scanned: usize) {
    if let Ok(mut bar) = pb.try_lock() {
        let _ = bar.update_to(items_scanned);
    }
}

/// Final refresh and line break so log output starts on a clean line.
pub fn finish_counter(pb: &ProgressBar) {
    if let Ok(mut bar) = pb.lock() {
        let _ = bar.refresh();
        eprintln!();
    }
}
