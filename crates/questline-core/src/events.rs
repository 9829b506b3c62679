use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{SessionPhase, SessionSummary};

/// Every outbound notification from the engine, as data.
/// Hosts forward these to whatever renders the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        session_id: String,
        activity_count: usize,
        at: DateTime<Utc>,
    },
    SessionPaused {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    SessionEnded {
        summary: SessionSummary,
    },
    TokenAwarded {
        new_count: u32,
        activity_index: usize,
        at: DateTime<Utc>,
    },
    ActivityChanged {
        new_index: usize,
        activity_id: String,
        at: DateTime<Utc>,
    },
    RewardClaimed {
        reward_id: String,
        token_count: u32,
        at: DateTime<Utc>,
    },
    /// Periodic elapsed-time recomputation while running.
    Tick {
        elapsed_secs: u64,
        remaining_secs: u64,
    },
    /// Elapsed time reached the planned session length. Sent once.
    PlannedDurationReached {
        planned_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: SessionPhase,
        session_id: String,
        session_name: String,
        current_index: usize,
        current_activity: Option<String>,
        elapsed_secs: u64,
        remaining_secs: u64,
        token_count: u32,
        max_tokens: u32,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
}

/// Outbound callbacks. Every method defaults to a no-op so hosts implement
/// only what they render.
pub trait SessionObserver: Send {
    fn on_session_started(&mut self) {}
    fn on_session_paused(&mut self) {}
    fn on_session_resumed(&mut self) {}
    fn on_session_ended(&mut self, _summary: &SessionSummary) {}
    fn on_token_awarded(&mut self, _new_count: u32) {}
    fn on_activity_changed(&mut self, _new_index: usize) {}

    /// Raw event feed, called for every event including the ones above.
    fn on_event(&mut self, _event: &Event) {}
}

/// Forwards events over a tokio channel. A closed receiver is ignored.
impl SessionObserver for tokio::sync::mpsc::UnboundedSender<Event> {
    fn on_event(&mut self, event: &Event) {
        let _ = self.send(event.clone());
    }
}

/// Collects events in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl SessionObserver for EventRecorder {
    fn on_event(&mut self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
