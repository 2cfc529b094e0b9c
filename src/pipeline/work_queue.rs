//! LIFO work queue shared by a producer and a fixed set of consumer threads.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use super::interrupt::InterruptionPoint;
use crate::error::Interrupted;

/// How long a blocked consumer sleeps before re-checking its interruption point.
const INTERRUPT_CHECK_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug)]
struct QueueState<T> {
    items: Vec<T>,
    closed: bool,
}

/// Thread-safe LIFO queue. `pop` blocks until an item arrives, the queue is closed
/// and drained, or the consumer is interrupted.
#[derive(Debug)]
pub struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: Vec::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    // A panicking consumer must not wedge the others.
    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, item: T) {
        self.lock().items.push(item);
        self.available.notify_one();
    }

    /// Most recently pushed item first. `Ok(None)` once closed and empty.
    pub fn pop(&self, interrupt: &InterruptionPoint) -> Result<Option<T>, Interrupted> {
        let mut state = self.lock();
        loop {
            interrupt.check()?;
            if let Some(item) = state.items.pop() {
                return Ok(Some(item));
            }
            if state.closed {
                return Ok(None);
            }
            state = self
                .available
                .wait_timeout(state, INTERRUPT_CHECK_INTERVAL)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    /// No more pushes; wakes every waiting consumer.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
