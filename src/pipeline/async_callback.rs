//! Worker/control synchronization point.
//!
//! Error prompts travel over a rendezvous channel, so only one prompt is in flight at a
//! time and a worker is parked until the control thread takes its request. Status
//! (current file, active threads) is a locked snapshot; the item counter is atomic.

use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use log::debug;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::interrupt::InterruptionPoint;
use crate::afs::HandleError;
use crate::error::Interrupted;
use crate::utils::config::TraversalConsts;

/// No active thread is designated to report.
const NO_REPORTER: usize = usize::MAX;

/// One error prompt from a worker. The control thread answers through `reply`.
#[derive(Debug)]
pub struct ErrorRequest {
    pub msg: String,
    pub retry_number: usize,
    reply: Sender<HandleError>,
}

#[derive(Debug, Default)]
struct StatusSnapshot {
    current_file: String,
    /// thread idx -> parallel ops of that worker
    active_threads: BTreeMap<usize, usize>,
}

#[derive(Debug)]
pub struct AsyncCallback {
    request_tx: Sender<ErrorRequest>,
    request_rx: Receiver<ErrorRequest>,
    done_tx: Sender<usize>,
    done_rx: Receiver<usize>,
    threads_to_finish: AtomicUsize,
    status: Mutex<StatusSnapshot>,
    /// Lowest active thread idx, the only one allowed to report the current file.
    reporter: AtomicUsize,
    items_scanned: AtomicUsize,
    callback_interval: Duration,
}

impl AsyncCallback {
    pub fn new(thread_count: usize) -> Self {
        Self::with_callback_interval(thread_count, TraversalConsts::CALLBACK_INTERVAL)
    }

    pub fn with_callback_interval(thread_count: usize, callback_interval: Duration) -> Self {
        let (request_tx, request_rx) = bounded(0);
        let (done_tx, done_rx) = unbounded();
        Self {
            request_tx,
            request_rx,
            done_tx,
            done_rx,
            threads_to_finish: AtomicUsize::new(thread_count),
            status: Mutex::new(StatusSnapshot::default()),
            reporter: AtomicUsize::new(NO_REPORTER),
            items_scanned: AtomicUsize::new(0),
            callback_interval,
        }
    }

    fn with_status<R>(&self, f: impl FnOnce(&mut StatusSnapshot) -> R) -> R {
        let mut status = self.status.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut status)
    }

    // ---- worker side ----

    /// Blocking prompt. Waits for the request slot, then for the answer; both waits end
    /// early with `Interrupted` when `interrupt` fires or the control thread gives up.
    pub fn report_error(
        &self,
        msg: &str,
        retry_number: usize,
        interrupt: &InterruptionPoint,
    ) -> Result<HandleError, Interrupted> {
        interrupt.check()?;
        let (reply, response) = bounded(1);
        let request = ErrorRequest {
            msg: msg.to_string(),
            retry_number,
            reply,
        };
        select! {
            send(self.request_tx, request) -> res => res.map_err(|_| Interrupted)?,
            recv(interrupt.receiver()) -> _ => return Err(Interrupted),
        }
        select! {
            recv(response) -> answer => answer.map_err(|_| Interrupted),
            recv(interrupt.receiver()) -> _ => Err(Interrupted),
        }
    }

    /// True if `thread_idx` is the designated reporter and its last report is older
    /// than the callback interval. Updates `last_report_time` when returning true.
    pub fn may_report_current_file(
        &self,
        thread_idx: usize,
        last_report_time: &mut Option<Instant>,
    ) -> bool {
        if self.reporter.load(Ordering::Acquire) != thread_idx {
            return false;
        }
        let now = Instant::now();
        match last_report_time {
            Some(last) if now.duration_since(*last) < self.callback_interval => false,
            _ => {
                *last_report_time = Some(now);
                true
            }
        }
    }

    pub fn report_current_file(&self, display_path: &str) {
        self.with_status(|s| {
            s.current_file.clear();
            s.current_file.push_str(display_path);
        });
    }

    pub fn inc_items_scanned(&self) {
        self.items_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn notify_work_begin(&self, thread_idx: usize, parallel_ops: usize) {
        self.with_status(|s| {
            s.active_threads.insert(thread_idx, parallel_ops);
            self.update_reporter(s);
        });
    }

    pub fn notify_work_end(&self, thread_idx: usize) {
        self.with_status(|s| {
            s.active_threads.remove(&thread_idx);
            self.update_reporter(s);
        });
    }

    /// Called exactly once per worker thread, last thing before it exits.
    pub fn notify_task_end(&self, thread_idx: usize) {
        let remaining = self
            .threads_to_finish
            .fetch_sub(1, Ordering::AcqRel)
            .saturating_sub(1);
        debug!("traverser {thread_idx} done, {remaining} remaining");
        let _ = self.done_tx.send(thread_idx);
    }

    fn update_reporter(&self, s: &StatusSnapshot) {
        let idx = s.active_threads.keys().next().copied().unwrap_or(NO_REPORTER);
        self.reporter.store(idx, Ordering::Release);
    }

    // ---- control side ----

    /// Status line: `"[N threads] "` prefix when at least two operations run, then the
    /// most recently reported path.
    pub fn current_status(&self) -> String {
        self.with_status(|s| {
            let parallel_ops: usize = s.active_threads.values().sum();
            if parallel_ops >= 2 {
                format!("[{parallel_ops} threads] {}", s.current_file)
            } else {
                s.current_file.clone()
            }
        })
    }

    pub fn items_scanned(&self) -> usize {
        self.items_scanned.load(Ordering::Relaxed)
    }

    pub fn threads_to_finish(&self) -> usize {
        self.threads_to_finish.load(Ordering::Acquire)
    }

    /// Serve error prompts and status updates until every worker called
    /// [`notify_task_end`](Self::notify_task_end), then report status once more.
    ///
    /// An `Err` from either callback is returned as is; the caller must interrupt the
    /// workers before joining them.
    pub fn wait_until_done<E, S>(
        &self,
        poll_interval: Duration,
        mut on_error: E,
        mut on_status_update: S,
    ) -> Result<(), Interrupted>
    where
        E: FnMut(&str, usize) -> Result<HandleError, Interrupted>,
        S: FnMut(&str, usize) -> Result<(), Interrupted>,
    {
        let mut last_update = Instant::now();
        while self.threads_to_finish() > 0 {
            select! {
                recv(self.request_rx) -> req => {
                    if let Ok(req) = req {
                        let answer = on_error(&req.msg, req.retry_number)?;
                        // worker may have been interrupted meanwhile
                        let _ = req.reply.send(answer);
                    }
                }
                recv(self.done_rx) -> _ => {}
                default(poll_interval) => {}
            }
            if last_update.elapsed() >= poll_interval {
                on_status_update(&self.current_status(), self.items_scanned())?;
                last_update = Instant::now();
            }
        }
        on_status_update(&self.current_status(), self.items_scanned())
    }
}
