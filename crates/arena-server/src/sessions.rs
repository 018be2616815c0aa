//! Open debate sessions, keyed by session id.
//!
//! The registry owns one pause-gate handle per open stream. Continue requests
//! find their session here; a [`SessionGuard`] removes the entry and closes
//! the gate when the session's task ends, however it ends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use orchestration::debate::GateError;
use orchestration::PauseGate;
use thiserror::Error;
use tracing::{debug, info};

/// Why a continue request could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContinueError {
    #[error("no debate session is open")]
    NoOpenSession,

    #[error("{0} debate sessions are open; specify session_id")]
    Ambiguous(usize),

    #[error("unknown debate session {0}")]
    UnknownSession(String),

    #[error("debate session {0} is not waiting for a continue signal")]
    NotPaused(String),
}

#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    gates: Arc<Mutex<HashMap<String, PauseGate>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and hand back its gate and the guard that unregisters it.
    pub fn register(&self, session_id: &str) -> (PauseGate, SessionGuard) {
        let gate = PauseGate::new();
        self.lock().insert(session_id.to_string(), gate.clone());
        debug!(session_id, "session registered");
        let guard = SessionGuard {
            registry: self.clone(),
            session_id: session_id.to_string(),
        };
        (gate, guard)
    }

    /// Deliver a continue signal. With no id, the single open session is targeted.
    ///
    /// Returns the id of the session that was released.
    pub fn release(&self, session_id: Option<&str>) -> Result<String, ContinueError> {
        let (id, gate) = {
            let gates = self.lock();
            match session_id {
                Some(id) => {
                    let gate = gates
                        .get(id)
                        .ok_or_else(|| ContinueError::UnknownSession(id.to_string()))?;
                    (id.to_string(), gate.clone())
                }
                None => match gates.len() {
                    0 => return Err(ContinueError::NoOpenSession),
                    1 => {
                        let (id, gate) = gates
                            .iter()
                            .next()
                            .ok_or(ContinueError::NoOpenSession)?;
                        (id.clone(), gate.clone())
                    }
                    n => return Err(ContinueError::Ambiguous(n)),
                },
            }
        };

        match gate.release() {
            Ok(()) => {
                info!(session_id = %id, "continue signal delivered");
                Ok(id)
            }
            Err(GateError::NotPaused | GateError::AlreadyPaused) => {
                Err(ContinueError::NotPaused(id))
            }
            Err(GateError::Closed) => Err(ContinueError::UnknownSession(id)),
        }
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Close every gate and forget all sessions. Used on shutdown.
    pub fn close_all(&self) {
        let gates: Vec<(String, PauseGate)> = self.lock().drain().collect();
        for (_, gate) in &gates {
            gate.close();
        }
        if !gates.is_empty() {
            info!(sessions = gates.len(), "closed open debate sessions");
        }
    }

    fn remove(&self, session_id: &str) {
        if let Some(gate) = self.lock().remove(session_id) {
            gate.close();
            debug!(session_id, "session unregistered");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PauseGate>> {
        self.gates.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Unregisters its session on drop.
#[derive(Debug)]
pub struct SessionGuard {
    registry: SessionRegistry,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.session_id);
    }
}
