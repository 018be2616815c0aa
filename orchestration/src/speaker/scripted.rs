//! Deterministic speakers for tests, enabled by the `test-util` feature.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use super::{Chunk, ChunkStream, Speaker, SpeakerContext, SpeakerError};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Script {
    /// Yield these chunks, then end.
    Chunks(Vec<Result<Chunk, SpeakerError>>),
    /// Fail the call before any stream exists.
    Fail(SpeakerError),
}

impl Script {
    /// Plain text fragments.
    pub fn text(fragments: &[&str]) -> Self {
        Self::Chunks(
            fragments
                .iter()
                .map(|f| Ok(Chunk::Text(f.to_string())))
                .collect(),
        )
    }
}

/// Deterministic speaker replaying a queue of scripts and recording every context.
///
/// Once the queue is drained the last script repeats.
#[derive(Debug, Clone)]
pub struct ScriptedSpeaker {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    last: Arc<Mutex<Option<Script>>>,
    seen: Arc<Mutex<Vec<SpeakerContext>>>,
}

impl ScriptedSpeaker {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            last: Arc::new(Mutex::new(None)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Speaker that always answers with the same fragments.
    pub fn repeating(fragments: &[&str]) -> Self {
        Self::new(vec![Script::text(fragments)])
    }

    /// Every context this speaker was called with, in call order.
    pub fn contexts(&self) -> Vec<SpeakerContext> {
        lock(&self.seen).clone()
    }

    fn next_script(&self) -> Option<Script> {
        let next = lock(&self.scripts).pop_front();
        let mut last = lock(&self.last);
        match next {
            Some(script) => {
                *last = Some(script.clone());
                Some(script)
            }
            None => last.clone(),
        }
    }
}

#[async_trait]
impl Speaker for ScriptedSpeaker {
    async fn generate(&self, context: &SpeakerContext) -> Result<ChunkStream, SpeakerError> {
        lock(&self.seen).push(context.clone());
        match self.next_script() {
            Some(Script::Chunks(chunks)) => Ok(stream::iter(chunks).boxed()),
            Some(Script::Fail(err)) => Err(err),
            None => Ok(stream::empty().boxed()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
