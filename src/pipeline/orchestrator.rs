//! Parallel traversal dispatcher: one worker thread per storage device, control
//! thread serving error prompts and status updates until all workers finish.

use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::thread;
use std::time::{Duration, Instant};

use super::async_callback::AsyncCallback;
use super::dir_callback::{DirCallback, TraverserConfig};
use super::interrupt::{InterruptionPoint, interruption_pair};
use super::parallel_ops::{DeviceParallelOps, cap_parallel_ops, get_device_parallel_ops};
use crate::afs::{AbstractPath, HandleError, TraverserCallback, TraverserWorkload};
use crate::error::Interrupted;
use crate::types::{DirectoryKey, DirectoryValue};

/// Output slots of one device, each owned by that device's worker only.
type DeviceSlots<'o> = Vec<(&'o DirectoryKey, &'o mut DirectoryValue)>;

/// Calls `notify_work_end` and `notify_task_end` even if the worker unwinds.
struct TaskEndGuard<'a> {
    acb: &'a AsyncCallback,
    thread_idx: usize,
}

impl Drop for TaskEndGuard<'_> {
    fn drop(&mut self) {
        self.acb.notify_work_end(self.thread_idx);
        self.acb.notify_task_end(self.thread_idx);
    }
}

/// Group the pre-allocated output slots by root device.
fn partition_by_device(
    output: &mut BTreeMap<DirectoryKey, DirectoryValue>,
) -> BTreeMap<AbstractPath, DeviceSlots<'_>> {
    let mut per_device: BTreeMap<AbstractPath, DeviceSlots<'_>> = BTreeMap::new();
    for (key, value) in output.iter_mut() {
        per_device
            .entry(key.folder_path.get_root_path())
            .or_default()
            .push((key, value));
    }
    per_device
}

/// Traverse all requests of one device, then move the failed reads into the slots.
fn traverse_device(
    root: &AbstractPath,
    mut slots: DeviceSlots<'_>,
    parallel_ops: usize,
    acb: &AsyncCallback,
    thread_idx: usize,
    interrupt: &InterruptionPoint,
) -> Result<(), Interrupted> {
    let configs: Vec<TraverserConfig<'_>> = slots
        .iter()
        .map(|(key, _)| TraverserConfig::new(key, acb, thread_idx, interrupt))
        .collect();

    let result = {
        let workload: TraverserWorkload<'_> = configs
            .iter()
            .zip(slots.iter_mut())
            .map(|(cfg, (key, value))| {
                let cb: Box<dyn TraverserCallback + '_> =
                    Box::new(DirCallback::new(cfg, &mut value.folder_cont));
                (key.folder_path.get_root_relative_path().clone(), cb)
            })
            .collect();
        root.device
            .fs()
            .traverse_folder_recursive(workload, parallel_ops, interrupt)
    };

    for (cfg, (_, value)) in configs.into_iter().zip(slots.iter_mut()) {
        let (failed_folder_reads, failed_item_reads) = cfg.into_failed_reads();
        value.failed_folder_reads = failed_folder_reads;
        value.failed_item_reads = failed_item_reads;
    }
    result
}

/// Traverse every requested folder, one worker thread per distinct root device.
///
/// Blocks the calling (control) thread. `on_error` answers each error prompt,
/// `on_status_update` receives the status line and scanned-item count every
/// `poll_interval` and once more at the end. An `Err` from either callback interrupts
/// all workers, joins them and is returned; partial results are discarded.
///
/// Read failures never make this fail: they end up in each value's `failed_*_reads`.
pub fn parallel_device_traversal<E, S>(
    folders_to_read: &BTreeSet<DirectoryKey>,
    device_parallel_ops: &DeviceParallelOps,
    on_error: E,
    on_status_update: S,
    poll_interval: Duration,
) -> Result<BTreeMap<DirectoryKey, DirectoryValue>, Interrupted>
where
    E: FnMut(&str, usize) -> Result<HandleError, Interrupted>,
    S: FnMut(&str, usize) -> Result<(), Interrupted>,
{
    let started = Instant::now();
    let mut output: BTreeMap<DirectoryKey, DirectoryValue> = folders_to_read
        .iter()
        .map(|key| (key.clone(), DirectoryValue::default()))
        .collect();

    let per_device = partition_by_device(&mut output);
    let device_count = per_device.len();
    debug!(
        "traversing {} folders on {} devices",
        folders_to_read.len(),
        device_count
    );

    let acb = AsyncCallback::new(device_count);
    let (interrupters, points): (Vec<_>, Vec<_>) =
        (0..device_count).map(|_| interruption_pair()).unzip();

    let waited = thread::scope(|s| {
        let handles: Vec<_> = per_device
            .into_iter()
            .zip(points)
            .enumerate()
            .map(|(thread_idx, ((root, slots), interrupt))| {
                let parallel_ops = cap_parallel_ops(
                    get_device_parallel_ops(device_parallel_ops, &root.display_path()),
                    device_count,
                );
                debug!(
                    "traverser {thread_idx}: {} ({} folders, {} parallel ops)",
                    root.display_path(),
                    slots.len(),
                    parallel_ops
                );
                let acb = &acb;
                s.spawn(move || {
                    let _task_end = TaskEndGuard { acb, thread_idx };
                    acb.notify_work_begin(thread_idx, parallel_ops);
                    let res = traverse_device(
                        &root,
                        slots,
                        parallel_ops,
                        acb,
                        thread_idx,
                        &interrupt,
                    );
                    if res.is_err() {
                        debug!("traverser {thread_idx} interrupted");
                    }
                })
            })
            .collect();

        let waited = acb.wait_until_done(poll_interval, on_error, on_status_update);
        if waited.is_err() {
            // a worker parked on the error slot must wake up before anyone joins it
            debug!("interrupting {} traversers", interrupters.len());
            for interrupter in &interrupters {
                interrupter.interrupt();
            }
        }
        for h in handles {
            if let Err(panic) = h.join() {
                std::panic::resume_unwind(panic);
            }
        }
        waited
    });
    waited?;

    info!(
        "Traversed {} folders ({} items) in {:.2?}",
        output.len(),
        acb.items_scanned(),
        started.elapsed()
    );
    Ok(output)
}
