//! Calming break with a guided breathing cycle.
//!
//! Timing is computed from timestamps passed in by the caller, so the break
//! stays correct no matter how often it is polled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActivityError, ActivityHost};
use crate::session::Advance;

pub const DEFAULT_EXTENSION_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreathingPattern {
    pub inhale_secs: u64,
    pub hold_secs: u64,
    pub exhale_secs: u64,
}

impl Default for BreathingPattern {
    fn default() -> Self {
        Self {
            inhale_secs: 4,
            hold_secs: 2,
            exhale_secs: 4,
        }
    }
}

impl BreathingPattern {
    pub fn cycle_secs(&self) -> u64 {
        self.inhale_secs + self.hold_secs + self.exhale_secs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathPhase {
    Inhale,
    Hold,
    Exhale,
}

#[derive(Debug, Clone)]
pub struct CalmingBreak {
    duration_secs: u64,
    started_at: DateTime<Utc>,
    extension_secs: u64,
    extended_secs: u64,
    pattern: BreathingPattern,
    finished: bool,
}

impl CalmingBreak {
    pub fn new(duration_secs: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            duration_secs,
            started_at,
            extension_secs: DEFAULT_EXTENSION_SECS,
            extended_secs: 0,
            pattern: BreathingPattern::default(),
            finished: false,
        }
    }

    pub fn with_extension(mut self, secs: u64) -> Self {
        self.extension_secs = secs;
        self
    }

    pub fn with_pattern(mut self, pattern: BreathingPattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn pattern(&self) -> BreathingPattern {
        self.pattern
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn total_secs(&self) -> u64 {
        self.duration_secs + self.extended_secs
    }

    fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        (now - self.started_at).num_seconds().max(0) as u64
    }

    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        self.total_secs().saturating_sub(self.elapsed_secs(now))
    }

    /// Adds one extension. Returns the new remaining time.
    pub fn extend(&mut self, now: DateTime<Utc>) -> Result<u64, ActivityError> {
        if self.finished {
            return Err(ActivityError::AlreadyComplete);
        }
        self.extended_secs += self.extension_secs;
        tracing::debug!(extended_secs = self.extended_secs, "break extended");
        Ok(self.remaining_secs(now))
    }

    pub fn end_early(&mut self, host: &mut dyn ActivityHost) -> Result<Advance, ActivityError> {
        if self.finished {
            return Err(ActivityError::AlreadyComplete);
        }
        self.finish(host)
    }

    /// Finishes the break once its time is up. `None` while time remains or
    /// after it already finished.
    pub fn poll(
        &mut self,
        host: &mut dyn ActivityHost,
        now: DateTime<Utc>,
    ) -> Result<Option<Advance>, ActivityError> {
        if self.finished || self.remaining_secs(now) > 0 {
            return Ok(None);
        }
        self.finish(host).map(Some)
    }

    pub fn breath_phase(&self, now: DateTime<Utc>) -> BreathPhase {
        let cycle = self.pattern.cycle_secs();
        if cycle == 0 {
            return BreathPhase::Inhale;
        }
        let pos = self.elapsed_secs(now) % cycle;
        if pos < self.pattern.inhale_secs {
            BreathPhase::Inhale
        } else if pos < self.pattern.inhale_secs + self.pattern.hold_secs {
            BreathPhase::Hold
        } else {
            BreathPhase::Exhale
        }
    }

    /// Completed breaths so far.
    pub fn breath_count(&self, now: DateTime<Utc>) -> u64 {
        let cycle = self.pattern.cycle_secs();
        if cycle == 0 {
            return 0;
        }
        self.elapsed_secs(now).min(self.total_secs()) / cycle
    }

    pub fn progress_percent(&self, now: DateTime<Utc>) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 100.0;
        }
        (self.elapsed_secs(now) as f64 / total as f64 * 100.0).min(100.0)
    }

    fn finish(&mut self, host: &mut dyn ActivityHost) -> Result<Advance, ActivityError> {
        let advance = host.complete_without_rate()?;
        self.finished = true;
        Ok(advance)
    }
}
