//! # Questline Core Library
//!
//! This library provides the core logic for running a gamified therapy
//! session: an ordered sequence of activities, a wall-clock session timer, a
//! per-activity progress ledger and a bounded token economy. It follows a
//! CLI-first philosophy where every operation is available through the
//! standalone `questline` binary, and any richer front end is a thin layer
//! over the same engine.
//!
//! ## Architecture
//!
//! - **Session Engine**: A lifecycle state machine (`not-started → running ⇄
//!   paused → ended`) whose elapsed time is recomputed from timestamps on
//!   every `tick()`, so missed ticks never cause drift
//! - **Activity Modules**: Speech, movement, role-play and calming-break
//!   drills that drive the engine only through [`ActivityHost`]
//! - **Storage**: SQLite summary archive and TOML-based configuration
//! - **Collaborator Bridge**: Async request/reply channel to speech capture
//!   and content generation
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Core session state machine
//! - [`Event`]: Outbound notifications, also delivered to [`SessionObserver`]s
//! - [`Database`]: Summary and engine-snapshot persistence
//! - [`Config`]: Application configuration management

pub mod activities;
pub mod collaborator;
pub mod error;
pub mod events;
pub mod session;
pub mod storage;
pub mod tokens;

pub use activities::{ActivityError, ActivityHost, ActivityModule};
pub use collaborator::{spawn_simulated, CollaboratorHandle, CollaboratorResponse};
pub use error::{ConfigError, CoreError, DatabaseError, SessionError, ValidationError};
pub use events::{Event, EventRecorder, SessionObserver};
pub use session::{
    ActivityCatalog, ActivityDescriptor, ActivityKind, ActivityProgress, ActivityStatus, Advance,
    EngineSettings, SessionConfig, SessionEngine, SessionPhase, SessionState, SessionSummary,
};
pub use storage::{Config, Database};
pub use tokens::{Reward, RewardCatalog, TokenEconomy};
