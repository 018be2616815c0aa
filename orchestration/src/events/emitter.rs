//! Event emitter — ordered delivery of debate events to one open stream.
//!
//! The orchestrator writes into a bounded channel; the transport drains the
//! receiver and turns each [`WireFrame`] into one SSE frame. A closed receiver
//! is how the orchestrator learns the client went away.

use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::types::DebateEvent;

/// Channel capacity between orchestrator and transport.
pub const CHANNEL_CAPACITY: usize = 64;

/// SSE event name of the end-of-stream sentinel frame.
pub const END_EVENT: &str = "end";

/// Data payload of the end-of-stream sentinel frame.
pub const END_SENTINEL: &str = "[DONE]";

/// Comment text of keepalive frames.
pub const KEEPALIVE_TEXT: &str = "ping";

/// Error type for emitter operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("client disconnected")]
    Disconnected,
}

/// One frame on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireFrame {
    /// A JSON-encoded debate event in an unnamed `data:` frame.
    Event(DebateEvent),
    /// `event: end` / `data: [DONE]`.
    End,
}

impl WireFrame {
    /// SSE `event:` name, `None` for plain data frames.
    pub fn event_name(&self) -> Option<&'static str> {
        match self {
            Self::Event(_) => None,
            Self::End => Some(END_EVENT),
        }
    }

    /// SSE `data:` payload.
    pub fn data(&self) -> String {
        match self {
            // DebateEvent holds only strings and integers; serializing cannot fail.
            Self::Event(event) => event.to_json().unwrap_or_default(),
            Self::End => END_SENTINEL.to_string(),
        }
    }

    /// Full SSE text of this frame, blank-line terminated.
    pub fn encode(&self) -> String {
        match self.event_name() {
            Some(name) => format!("event: {}\ndata: {}\n\n", name, self.data()),
            None => format!("data: {}\n\n", self.data()),
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    pub fn event(&self) -> Option<&DebateEvent> {
        match self {
            Self::Event(event) => Some(event),
            Self::End => None,
        }
    }
}

/// Writes one session's events, in order, to its stream.
#[derive(Debug)]
pub struct EventEmitter {
    tx: mpsc::Sender<WireFrame>,
    session_id: String,
    sent: u64,
}

impl EventEmitter {
    /// Create an emitter and the receiver the transport drains.
    pub fn channel(session_id: &str) -> (Self, mpsc::Receiver<WireFrame>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (
            Self {
                tx,
                session_id: session_id.to_string(),
                sent: 0,
            },
            rx,
        )
    }

    /// Send one event. Fails once the client has gone away.
    pub async fn emit(&mut self, event: DebateEvent) -> Result<(), EmitError> {
        let event_type = event.event_type();
        self.send(WireFrame::Event(event)).await?;
        trace!(session_id = %self.session_id, event_type, "event emitted");
        Ok(())
    }

    /// Emit `debate_end` followed by the end sentinel.
    pub async fn finish(&mut self) -> Result<(), EmitError> {
        self.emit(DebateEvent::debate_end()).await?;
        self.send(WireFrame::End).await?;
        debug!(session_id = %self.session_id, frames = self.sent, "stream finished");
        Ok(())
    }

    /// Resolves once the receiving side has been dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Frames delivered so far.
    pub fn frames_sent(&self) -> u64 {
        self.sent
    }

    async fn send(&mut self, frame: WireFrame) -> Result<(), EmitError> {
        if self.tx.is_closed() {
            return Err(EmitError::Disconnected);
        }
        self.tx
            .send(frame)
            .await
            .map_err(|_| EmitError::Disconnected)?;
        self.sent += 1;
        Ok(())
    }
}
