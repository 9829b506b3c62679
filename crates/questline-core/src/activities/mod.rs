//! Activity modules.
//!
//! Each module is its own small state machine. It talks to the session only
//! through [`ActivityHost`] and never sees engine internals; the host wires a
//! module to the engine for the duration of one activity.

mod calming_break;
mod movement;
mod role_play;
mod speech;

pub use calming_break::{BreathPhase, BreathingPattern, CalmingBreak, DEFAULT_EXTENSION_SECS};
pub use movement::{Movement, MovementAction, MovementDrill};
pub use role_play::{RolePlayDrill, TopicFact};
pub use speech::SpeechDrill;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::SessionError;
use crate::session::{ActivityKind, Advance, Clock, SessionEngine};
use crate::tokens::{crossed_threshold, METER_QUARTER};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActivityError {
    /// The session rejected a callback
    #[error(transparent)]
    Host(#[from] SessionError),

    #[error("{0} has nothing to practice")]
    NoItems(&'static str),

    #[error("activity already complete")]
    AlreadyComplete,

    #[error("recording already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,
}

/// The calls an activity module may make into the running session.
pub trait ActivityHost {
    fn award_token(&mut self) -> Result<u32, SessionError>;
    fn on_attempt(&mut self) -> Result<(), SessionError>;
    fn on_success(&mut self, did_succeed: bool) -> Result<(), SessionError>;
    fn on_complete(&mut self, success_rate: f64) -> Result<Advance, SessionError>;
    /// Finish an activity that has no success rate, such as a break.
    fn complete_without_rate(&mut self) -> Result<Advance, SessionError>;
}

impl<C: Clock> ActivityHost for SessionEngine<C> {
    fn award_token(&mut self) -> Result<u32, SessionError> {
        SessionEngine::award_token(self)
    }

    fn on_attempt(&mut self) -> Result<(), SessionError> {
        SessionEngine::on_attempt(self)
    }

    fn on_success(&mut self, did_succeed: bool) -> Result<(), SessionError> {
        SessionEngine::on_success(self, did_succeed)
    }

    fn on_complete(&mut self, success_rate: f64) -> Result<Advance, SessionError> {
        SessionEngine::on_complete(self, success_rate)
    }

    fn complete_without_rate(&mut self) -> Result<Advance, SessionError> {
        SessionEngine::complete_without_rate(self)
    }
}

/// Module-side view shared by every drill.
pub trait ActivityModule {
    fn kind(&self) -> ActivityKind;
    fn is_complete(&self) -> bool;
    fn tally(&self) -> AttemptTally;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttemptTally {
    pub attempts: u32,
    pub successes: u32,
}

impl AttemptTally {
    /// Successes over attempts as a percentage; zero attempts reads as 0.
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        (self.successes as f64 / self.attempts as f64 * 100.0).min(100.0)
    }
}

/// 0..=100 progress meter that reports quarter crossings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Meter {
    value: f64,
}

impl Meter {
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Raise by `step`, capped at 100. True when a quarter was crossed.
    pub fn raise(&mut self, step: f64) -> bool {
        let old = self.value;
        self.value = (old + step).min(100.0);
        crossed_threshold(old, self.value, METER_QUARTER)
    }
}

/// Shared success path: count it, raise the meter, award on a quarter.
/// Nothing is committed unless the host accepts the callbacks.
fn record_success(
    host: &mut dyn ActivityHost,
    tally: &mut AttemptTally,
    meter: &mut Meter,
    step: f64,
) -> Result<(), ActivityError> {
    let mut raised = *meter;
    if raised.raise(step) {
        host.award_token()?;
    }
    host.on_success(true)?;
    tally.successes += 1;
    *meter = raised;
    Ok(())
}
