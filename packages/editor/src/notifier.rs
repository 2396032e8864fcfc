//! # Status Notifier
//!
//! One process-wide, short-lived message reporting the outcome of the last
//! operation. A new message replaces the current one and restarts the
//! expiry clock. Messages are never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// How long a message stays visible
pub const DEFAULT_MESSAGE_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
    pub issued_at: DateTime<Utc>,
}

struct Slot {
    message: Option<StatusMessage>,
    expires_at: Option<Instant>,
    /// Bumped on every notify; an expiry task only clears its own message
    generation: u64,
}

struct Shared {
    slot: Mutex<Slot>,
    tx: watch::Sender<Option<StatusMessage>>,
}

/// Cheap to clone; all clones share the same message slot
#[derive(Clone)]
pub struct StatusNotifier {
    shared: Arc<Shared>,
    ttl: Duration,
}

impl StatusNotifier {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_MESSAGE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    message: None,
                    expires_at: None,
                    generation: 0,
                }),
                tx,
            }),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn success(&self, text: impl Into<String>) {
        self.notify(StatusKind::Success, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.notify(StatusKind::Error, text);
    }

    /// Show `text`, replacing any current message, and schedule its expiry
    pub fn notify(&self, kind: StatusKind, text: impl Into<String>) {
        let message = StatusMessage {
            kind,
            text: text.into(),
            issued_at: Utc::now(),
        };

        let generation = {
            let mut slot = self.lock();
            slot.generation += 1;
            slot.message = Some(message.clone());
            slot.expires_at = Some(Instant::now() + self.ttl);
            slot.generation
        };

        match kind {
            StatusKind::Success => tracing::info!(text = %message.text, "status"),
            StatusKind::Error => tracing::warn!(text = %message.text, "status"),
        }
        self.shared.tx.send_replace(Some(message));

        // Outside a runtime the message still expires lazily in `current()`
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let shared = Arc::downgrade(&self.shared);
            let ttl = self.ttl;
            handle.spawn(async move {
                tokio::time::sleep(ttl).await;
                if let Some(shared) = shared.upgrade() {
                    let mut slot = shared.slot.lock().unwrap_or_else(PoisonError::into_inner);
                    if slot.generation == generation {
                        slot.message = None;
                        slot.expires_at = None;
                        drop(slot);
                        shared.tx.send_replace(None);
                    }
                }
            });
        }
    }

    /// The visible message, if any has been issued and not yet expired
    pub fn current(&self) -> Option<StatusMessage> {
        let mut slot = self.lock();
        match slot.expires_at {
            Some(expires_at) if Instant::now() >= expires_at => {
                slot.message = None;
                slot.expires_at = None;
                None
            }
            _ => slot.message.clone(),
        }
    }

    /// Drop the current message immediately
    pub fn clear(&self) {
        {
            let mut slot = self.lock();
            slot.generation += 1;
            slot.message = None;
            slot.expires_at = None;
        }
        self.shared.tx.send_replace(None);
    }

    /// Observe message changes, including expiry
    pub fn subscribe(&self) -> watch::Receiver<Option<StatusMessage>> {
        self.shared.tx.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.shared.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StatusNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatusNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusNotifier")
            .field("ttl", &self.ttl)
            .field("current", &self.current())
            .finish()
    }
}
