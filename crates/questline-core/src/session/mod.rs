mod catalog;
mod clock;
mod config;
mod engine;
mod ledger;
mod summary;
pub mod ticker;

pub use catalog::{ActivityCatalog, ActivityDescriptor, ActivityKind};
pub use clock::{format_clock, Clock, ElapsedClock, ManualClock, SystemClock};
pub use config::{ColorScheme, SessionConfig};
pub use engine::{Advance, EngineSettings, SessionEngine, SessionPhase, SessionState};
pub use ledger::{validate_rate, ActivityProgress, ActivityStatus, ProgressLedger, SuccessBand};
pub use summary::SessionSummary;
pub use ticker::Ticker;
