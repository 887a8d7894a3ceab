//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`SessionEventBus`] is the hub between the session core and whatever
//! presentation layer hosts it. It is designed to be shared via
//! `Arc<SessionEventBus>`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use wayfare_core::snapshot::DraftSnapshot;

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A user-visible notification that never blocks the session.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// The action can be retried by the user (save, load, search).
    pub retryable: bool,
    pub timestamp: DateTime<Utc>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message, false)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message, false)
    }

    /// A failed network action the user may retry.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message, true)
    }

    fn new(level: NoticeLevel, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            level,
            message: message.into(),
            retryable,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Something the presentation layer should react to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    StepChanged { from: u8, to: u8 },
    DraftSaved { draft_id: String },
    DraftLoaded { draft_id: Option<String> },
    /// All steps validated; the snapshot is handed to the booking pipeline.
    SubmitRequested { snapshot: Box<DraftSnapshot> },
    SessionAbandoned,
    /// Provider selections changed; lists should be re-rendered.
    SelectionsChanged,
    Notice(Notice),
}

impl SessionEvent {
    /// Dot-separated name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StepChanged { .. } => "session.step_changed",
            Self::DraftSaved { .. } => "session.draft_saved",
            Self::DraftLoaded { .. } => "session.draft_loaded",
            Self::SubmitRequested { .. } => "session.submit_requested",
            Self::SessionAbandoned => "session.abandoned",
            Self::SelectionsChanged => "selection.changed",
            Self::Notice(_) => "session.notice",
        }
    }
}

// ---------------------------------------------------------------------------
// SessionEventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use wayfare_events::bus::{SessionEvent, SessionEventBus};
///
/// let bus = SessionEventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(SessionEvent::StepChanged { from: 1, to: 2 });
/// ```
pub struct SessionEventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is dropped.
    pub fn publish(&self, event: SessionEvent) {
        tracing::trace!(event = event.name(), "Publishing session event");
        // Ignore the SendError; it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Shorthand for publishing a [`Notice`].
    pub fn notify(&self, notice: Notice) {
        self.publish(SessionEvent::Notice(notice));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for SessionEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
