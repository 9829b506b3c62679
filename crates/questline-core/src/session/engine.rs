//! Session orchestration engine.
//!
//! The engine is a wall-clock-based state machine. It does not use internal
//! threads; the host calls `tick()` periodically (see [`super::ticker`]) and
//! serializes every mutating call through `&mut self`.
//!
//! ## State Transitions
//!
//! ```text
//! NotStarted -> Running <-> Paused -> Ended
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(config, EngineSettings::default())?;
//! engine.start()?;
//! engine.award_token()?;
//! engine.next_activity()?;
//! let summary = engine.end()?;
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::catalog::ActivityDescriptor;
use super::clock::{Clock, ElapsedClock, SystemClock};
use super::config::SessionConfig;
use super::ledger::{validate_rate, ProgressLedger};
use super::summary::SessionSummary;
use crate::error::{Operation, SessionError, ValidationError};
use crate::events::{Event, SessionObserver};
use crate::tokens::{Reward, RewardCatalog, TokenEconomy, DEFAULT_MAX_TOKENS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    NotStarted,
    Running,
    Paused,
    Ended,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::NotStarted => "not-started",
            SessionPhase::Running => "running",
            SessionPhase::Paused => "paused",
            SessionPhase::Ended => "ended",
        };
        f.write_str(name)
    }
}

/// Engine knobs that come from application configuration rather than from
/// the session itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub max_tokens: u32,
    pub rewards: RewardCatalog,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            rewards: RewardCatalog::default(),
        }
    }
}

/// Outcome of an advance request.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Target was at or behind the current activity.
    Unchanged,
    Moved { from: usize, to: usize },
    /// Target ran past the last activity; the session ended.
    Ended(SessionSummary),
}

/// Everything the engine owns for one session. Serializable so a host can
/// park a live session between process invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    config: SessionConfig,
    phase: SessionPhase,
    clock: ElapsedClock,
    current_index: usize,
    tokens: TokenEconomy,
    ledger: ProgressLedger,
    rewards: RewardCatalog,
    #[serde(default)]
    claimed_rewards: Vec<String>,
    #[serde(default)]
    planned_reached: bool,
    #[serde(default)]
    summary: Option<SessionSummary>,
}

impl SessionState {
    fn new(config: SessionConfig, settings: EngineSettings) -> Self {
        let ledger = ProgressLedger::for_catalog(&config.activities);
        Self {
            config,
            phase: SessionPhase::NotStarted,
            clock: ElapsedClock::default(),
            current_index: 0,
            tokens: TokenEconomy::new(settings.max_tokens),
            ledger,
            rewards: settings.rewards,
            claimed_rewards: Vec::new(),
            planned_reached: false,
            summary: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

/// Core session engine.
pub struct SessionEngine<C = SystemClock> {
    state: SessionState,
    clock: C,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl SessionEngine<SystemClock> {
    pub fn new(config: SessionConfig, settings: EngineSettings) -> Result<Self, SessionError> {
        Self::with_clock(config, settings, SystemClock)
    }
}

impl<C: Clock> SessionEngine<C> {
    pub fn with_clock(
        config: SessionConfig,
        settings: EngineSettings,
        clock: C,
    ) -> Result<Self, SessionError> {
        if settings.max_tokens == 0 {
            return Err(SessionError::Configuration(
                "max_tokens must be at least 1".into(),
            ));
        }
        Ok(Self {
            state: SessionState::new(config, settings),
            clock,
            observers: Vec::new(),
        })
    }

    /// Rebuild an engine around a previously saved state.
    pub fn from_state(state: SessionState, clock: C) -> Self {
        Self {
            state,
            clock,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl SessionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current time on the engine's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn config(&self) -> &SessionConfig {
        &self.state.config
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn current_activity(&self) -> Option<&ActivityDescriptor> {
        self.state.config.activities.get(self.state.current_index)
    }

    pub fn upcoming_activity(&self) -> Option<&ActivityDescriptor> {
        self.state.config.activities.get(self.state.current_index + 1)
    }

    pub fn tokens(&self) -> &TokenEconomy {
        &self.state.tokens
    }

    pub fn token_count(&self) -> u32 {
        self.state.tokens.count()
    }

    pub fn ledger(&self) -> &ProgressLedger {
        &self.state.ledger
    }

    pub fn rewards(&self) -> &RewardCatalog {
        &self.state.rewards
    }

    pub fn claimed_rewards(&self) -> &[String] {
        &self.state.claimed_rewards
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.state.summary.as_ref()
    }

    /// Seconds since start, excluding paused intervals. Frozen while paused
    /// and after the end.
    pub fn elapsed_seconds(&self) -> u64 {
        self.state.clock.elapsed_secs(self.clock.now())
    }

    /// Planned seconds left, never below zero.
    pub fn remaining_seconds(&self) -> u64 {
        self.state
            .config
            .duration_secs()
            .saturating_sub(self.elapsed_seconds())
    }

    /// 0.0 .. 100.0 of the planned duration used so far.
    pub fn time_progress_percent(&self) -> f64 {
        let planned = self.state.config.duration_secs();
        if planned == 0 {
            return 0.0;
        }
        (self.elapsed_seconds() as f64 / planned as f64 * 100.0).min(100.0)
    }

    /// `completedCount / totalActivities * 100`.
    pub fn session_progress_percent(&self) -> f64 {
        self.state.ledger.completion_percent()
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.state.phase,
            session_id: self.state.config.id.clone(),
            session_name: self.state.config.name.clone(),
            current_index: self.state.current_index,
            current_activity: self.current_activity().map(|a| a.name.clone()),
            elapsed_secs: self.elapsed_seconds(),
            remaining_secs: self.remaining_seconds(),
            token_count: self.state.tokens.count(),
            max_tokens: self.state.tokens.max(),
            progress_pct: self.session_progress_percent(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Result<(), SessionError> {
        self.require(Operation::Start, &[SessionPhase::NotStarted])?;
        self.state.config.activities.validate()?;

        let now = self.clock.now();
        self.state.ledger.mark_in_progress(0)?;
        self.state.clock.start(now);
        self.state.current_index = 0;
        self.state.phase = SessionPhase::Running;

        tracing::info!(
            session_id = %self.state.config.id,
            activities = self.state.ledger.len(),
            "session started"
        );
        self.emit(Event::SessionStarted {
            session_id: self.state.config.id.clone(),
            activity_count: self.state.ledger.len(),
            at: now,
        });
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.require(Operation::Pause, &[SessionPhase::Running])?;
        let now = self.clock.now();
        self.state.clock.pause(now);
        self.state.phase = SessionPhase::Paused;

        let elapsed_secs = self.elapsed_seconds();
        tracing::info!(session_id = %self.state.config.id, elapsed_secs, "session paused");
        self.emit(Event::SessionPaused { elapsed_secs, at: now });
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.require(Operation::Resume, &[SessionPhase::Paused])?;
        let now = self.clock.now();
        self.state.clock.resume(now);
        self.state.phase = SessionPhase::Running;

        let elapsed_secs = self.elapsed_seconds();
        tracing::info!(session_id = %self.state.config.id, elapsed_secs, "session resumed");
        self.emit(Event::SessionResumed { elapsed_secs, at: now });
        Ok(())
    }

    /// Move forward to `target`, completing everything passed on the way.
    ///
    /// Targets at or behind the current activity are a no-op. Targets past
    /// the last activity complete the rest and end the session.
    pub fn advance_activity(&mut self, target: usize) -> Result<Advance, SessionError> {
        self.require(Operation::Advance, &[SessionPhase::Running])?;
        let from = self.state.current_index;
        if target <= from {
            return Ok(Advance::Unchanged);
        }

        let len = self.state.ledger.len();
        if target >= len {
            for index in from..len {
                self.state.ledger.mark_completed(index)?;
            }
            let summary = self.end()?;
            return Ok(Advance::Ended(summary));
        }

        for index in from..target {
            self.state.ledger.mark_completed(index)?;
        }
        self.state.ledger.mark_in_progress(target)?;
        self.state.current_index = target;

        let activity_id = self
            .current_activity()
            .map(|a| a.id.clone())
            .unwrap_or_default();
        tracing::info!(from, to = target, %activity_id, "activity changed");
        self.emit(Event::ActivityChanged {
            new_index: target,
            activity_id,
            at: self.clock.now(),
        });
        Ok(Advance::Moved { from, to: target })
    }

    /// Therapist "next activity" control.
    pub fn next_activity(&mut self) -> Result<Advance, SessionError> {
        self.advance_activity(self.state.current_index + 1)
    }

    pub fn record_success_rate(&mut self, index: usize, rate: f64) -> Result<(), SessionError> {
        self.require_not_ended(Operation::RecordSuccessRate)?;
        self.state.ledger.set_success_rate(index, rate)?;
        tracing::debug!(index, rate, "success rate recorded");
        Ok(())
    }

    /// Adds a token to the session and to the current activity. At the cap
    /// this is a no-op. Returns the token count after the call.
    pub fn award_token(&mut self) -> Result<u32, SessionError> {
        self.require_not_ended(Operation::AwardToken)?;
        let index = self.state.current_index;
        let len = self.state.ledger.len();
        if index >= len {
            return Err(SessionError::Index { index, len });
        }

        if !self.state.tokens.add() {
            tracing::debug!(max = self.state.tokens.max(), "token cap reached");
            return Ok(self.state.tokens.count());
        }
        self.state.ledger.add_tokens(index, 1)?;

        let new_count = self.state.tokens.count();
        tracing::debug!(new_count, activity_index = index, "token awarded");
        self.emit(Event::TokenAwarded {
            new_count,
            activity_index: index,
            at: self.clock.now(),
        });
        Ok(new_count)
    }

    /// Claim a reward the current token count affords. Tokens are not spent.
    pub fn claim_reward(&mut self, reward_id: &str) -> Result<Reward, SessionError> {
        self.require_not_ended(Operation::ClaimReward)?;
        let reward = self
            .state
            .rewards
            .get(reward_id)
            .cloned()
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "reward".into(),
                message: format!("unknown reward '{reward_id}'"),
            })?;
        let count = self.state.tokens.count();
        if count < reward.token_cost {
            return Err(ValidationError::InvalidValue {
                field: "reward".into(),
                message: format!(
                    "'{}' needs {} tokens, have {count}",
                    reward.id, reward.token_cost
                ),
            }
            .into());
        }

        self.state.claimed_rewards.push(reward.id.clone());
        tracing::info!(reward_id = %reward.id, token_count = count, "reward claimed");
        self.emit(Event::RewardClaimed {
            reward_id: reward.id.clone(),
            token_count: count,
            at: self.clock.now(),
        });
        Ok(reward)
    }

    pub fn end(&mut self) -> Result<SessionSummary, SessionError> {
        self.require(Operation::End, &[SessionPhase::Running, SessionPhase::Paused])?;
        let now = self.clock.now();
        let elapsed_seconds = self.state.clock.freeze(now);
        self.state.phase = SessionPhase::Ended;

        let config = &self.state.config;
        let summary = SessionSummary {
            session_id: config.id.clone(),
            session_name: config.name.clone(),
            elapsed_seconds,
            activities: self.state.ledger.entries().to_vec(),
            tokens_earned: self.state.tokens.count(),
            speech_targets: config.speech_targets.clone(),
            behavior_focus: config.behavior_focus.clone(),
            completion_timestamp: now,
        };
        self.state.summary = Some(summary.clone());

        tracing::info!(
            session_id = %summary.session_id,
            elapsed_seconds,
            completed = summary.completed_count(),
            tokens = summary.tokens_earned,
            "session ended"
        );
        self.emit(Event::SessionEnded {
            summary: summary.clone(),
        });
        Ok(summary)
    }

    /// Recompute elapsed time. Call periodically while the session runs.
    ///
    /// Returns `PlannedDurationReached` the first time elapsed time meets the
    /// planned length, a `Tick` otherwise, and nothing outside `Running`.
    pub fn tick(&mut self) -> Option<Event> {
        if self.state.phase != SessionPhase::Running {
            return None;
        }
        let now = self.clock.now();
        let elapsed_secs = self.state.clock.observe(now);
        let planned_secs = self.state.config.duration_secs();

        let event = if !self.state.planned_reached && planned_secs > 0 && elapsed_secs >= planned_secs {
            self.state.planned_reached = true;
            tracing::info!(planned_secs, "planned session length reached");
            Event::PlannedDurationReached { planned_secs, at: now }
        } else {
            Event::Tick {
                elapsed_secs,
                remaining_secs: planned_secs.saturating_sub(elapsed_secs),
            }
        };
        self.emit(event.clone());
        Some(event)
    }

    // ── Inbound collaborator contract ────────────────────────────────

    /// Informational; the activity module keeps its own counters.
    pub fn on_attempt(&mut self) -> Result<(), SessionError> {
        self.require_not_ended(Operation::Attempt)?;
        tracing::debug!(activity_index = self.state.current_index, "attempt");
        Ok(())
    }

    /// Informational; the module reports its final rate via `on_complete`.
    pub fn on_success(&mut self, did_succeed: bool) -> Result<(), SessionError> {
        self.require_not_ended(Operation::Success)?;
        tracing::debug!(activity_index = self.state.current_index, did_succeed, "attempt outcome");
        Ok(())
    }

    /// Record the finishing module's rate on the current activity, then move
    /// to the next one. Validates everything before mutating.
    pub fn on_complete(&mut self, success_rate: f64) -> Result<Advance, SessionError> {
        self.require(Operation::Complete, &[SessionPhase::Running])?;
        validate_rate(success_rate)?;
        let index = self.state.current_index;
        self.state.ledger.set_success_rate(index, success_rate)?;
        self.advance_activity(index + 1)
    }

    /// Complete the current activity without a success rate (breaks,
    /// reward exchanges).
    pub fn complete_without_rate(&mut self) -> Result<Advance, SessionError> {
        self.require(Operation::Complete, &[SessionPhase::Running])?;
        self.next_activity()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn require(&self, operation: Operation, allowed: &[SessionPhase]) -> Result<(), SessionError> {
        if allowed.contains(&self.state.phase) {
            Ok(())
        } else {
            Err(SessionError::State {
                operation,
                phase: self.state.phase,
            })
        }
    }

    fn require_not_ended(&self, operation: Operation) -> Result<(), SessionError> {
        self.require(
            operation,
            &[
                SessionPhase::NotStarted,
                SessionPhase::Running,
                SessionPhase::Paused,
            ],
        )
    }

    fn emit(&mut self, event: Event) {
        for observer in &mut self.observers {
            match &event {
                Event::SessionStarted { .. } => observer.on_session_started(),
                Event::SessionPaused { .. } => observer.on_session_paused(),
                Event::SessionResumed { .. } => observer.on_session_resumed(),
                Event::SessionEnded { summary } => observer.on_session_ended(summary),
                Event::TokenAwarded { new_count, .. } => observer.on_token_awarded(*new_count),
                Event::ActivityChanged { new_index, .. } => {
                    observer.on_activity_changed(*new_index)
                }
                _ => {}
            }
            observer.on_event(&event);
        }
    }
}

impl<C> std::fmt::Debug for SessionEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish()
    }
}
