//! Fire-and-forget replay recording.
//!
//! The recorder sits between a table's event stream and a storage sink.
//! Appending goes through a bounded queue drained by a background task, so
//! the hand-complete path never blocks on slow storage; overflow drops the
//! event and logs it instead of stalling the table.

use std::sync::{Arc, Mutex};

use log::warn;
use tokio::sync::mpsc;

use crate::game::GameEvent;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1_024;

/// Durable storage for a table's event stream. Implementations live
/// outside the core; appends must be cheap or internally buffered.
pub trait ReplaySink: Send + Sync {
    fn append(&self, event: &GameEvent);
}

/// An in-memory sink for tests and local tooling.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<GameEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<GameEvent> {
        self.events.lock().expect("sink lock").clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().expect("sink lock").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReplaySink for MemorySink {
    fn append(&self, event: &GameEvent) {
        self.events.lock().expect("sink lock").push(event.clone());
    }
}

/// Bridges a table's events into a sink without blocking the table worker.
pub struct ReplayRecorder {
    tx: mpsc::Sender<GameEvent>,
}

impl ReplayRecorder {
    /// Spawn the drain task. Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(sink: Arc<dyn ReplaySink>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<GameEvent>(capacity.max(1));
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                sink.append(&event);
            }
        });
        Self { tx }
    }

    /// Queue an event for persistence. Never blocks; a full queue drops
    /// the event.
    pub fn record(&self, event: GameEvent) {
        if let Err(err) = self.tx.try_send(event) {
            match err {
                mpsc::error::TrySendError::Full(event) => warn!(
                    "replay queue full, dropping event {} of hand {}",
                    event.sequence_id, event.hand_number
                ),
                mpsc::error::TrySendError::Closed(_) => {
                    warn!("replay sink task gone, dropping event");
                }
            }
        }
    }
}
