//! Pause gate — single-slot rendezvous between rounds.
//!
//! The orchestrator arms the gate after a round's judgement and awaits the
//! returned [`PauseWait`]. A clone of the gate held elsewhere (the session
//! registry) delivers the continue signal with [`PauseGate::release`]. There
//! is no timeout: the wait ends on a continue signal or on [`PauseGate::close`].

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

/// Error from pause gate operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("session is not paused")]
    NotPaused,

    #[error("session is already paused")]
    AlreadyPaused,

    #[error("session gate is closed")]
    Closed,
}

/// How a pause ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    /// A continue signal arrived.
    Continue,
    /// The gate was closed (session teardown).
    Closed,
}

#[derive(Debug, Default)]
struct Slot {
    waiter: Option<oneshot::Sender<()>>,
    closed: bool,
}

/// Cloneable handle to one session's gate.
#[derive(Debug, Clone, Default)]
pub struct PauseGate {
    slot: Arc<Mutex<Slot>>,
}

/// Pending wait returned by [`PauseGate::arm`].
#[derive(Debug)]
pub struct PauseWait {
    rx: oneshot::Receiver<()>,
}

impl PauseWait {
    /// Suspend until released or closed.
    pub async fn wait(self) -> GateSignal {
        match self.rx.await {
            Ok(()) => GateSignal::Continue,
            Err(_) => GateSignal::Closed,
        }
    }
}

impl PauseGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the slot for exactly one continue signal.
    pub fn arm(&self) -> Result<PauseWait, GateError> {
        let mut slot = self.lock();
        if slot.closed {
            return Err(GateError::Closed);
        }
        if slot.waiter.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(GateError::AlreadyPaused);
        }
        let (tx, rx) = oneshot::channel();
        slot.waiter = Some(tx);
        Ok(PauseWait { rx })
    }

    /// Deliver the continue signal to the armed waiter.
    pub fn release(&self) -> Result<(), GateError> {
        let mut slot = self.lock();
        if slot.closed {
            return Err(GateError::Closed);
        }
        match slot.waiter.take() {
            // A dropped receiver means the waiter was cancelled; treat as not paused.
            Some(tx) => tx.send(()).map_err(|_| GateError::NotPaused),
            None => Err(GateError::NotPaused),
        }
    }

    /// Close the gate; any pending wait resolves to [`GateSignal::Closed`].
    pub fn close(&self) {
        let mut slot = self.lock();
        slot.closed = true;
        slot.waiter = None;
    }

    /// Whether a waiter is currently parked on the gate.
    pub fn is_paused(&self) -> bool {
        self.lock()
            .waiter
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        // The slot holds no invariants a panicking holder could break.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
