//! Cooperative cancellation: one [`Interrupter`] per worker, checked at [`InterruptionPoint`]s.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::Interrupted;

/// Control-thread half. Interrupting sets the flag and drops the wake-up sender so
/// every blocked `select!` on the paired receiver returns at once.
#[derive(Debug)]
pub struct Interrupter {
    flag: Arc<AtomicBool>,
    wake_tx: Mutex<Option<Sender<()>>>,
}

/// Worker half, cheap to clone.
#[derive(Debug, Clone)]
pub struct InterruptionPoint {
    flag: Arc<AtomicBool>,
    wake_rx: Receiver<()>,
}

pub fn interruption_pair() -> (Interrupter, InterruptionPoint) {
    let flag = Arc::new(AtomicBool::new(false));
    let (wake_tx, wake_rx) = bounded(0);
    (
        Interrupter {
            flag: Arc::clone(&flag),
            wake_tx: Mutex::new(Some(wake_tx)),
        },
        InterruptionPoint { flag, wake_rx },
    )
}

impl Interrupter {
    /// Idempotent.
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
        if let Ok(mut tx) = self.wake_tx.lock() {
            tx.take();
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl InterruptionPoint {
    /// Returns `Err(Interrupted)` once the paired [`Interrupter`] fired.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.flag.load(Ordering::SeqCst) {
            return Err(Interrupted);
        }
        Ok(())
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Becomes ready (disconnected) on interruption. Use inside `select!`.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.wake_rx
    }
}
