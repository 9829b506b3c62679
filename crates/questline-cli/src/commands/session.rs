use std::path::PathBuf;

use clap::{builder::BoolishValueParser, ArgAction, Subcommand};
use questline_core::session::{SessionConfig, SessionEngine, SessionPhase, SessionState, SystemClock};
use questline_core::storage::{Config, Database};
use questline_core::{Event, EventRecorder};

const ENGINE_KEY: &str = "session_engine";

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a new session
    Start {
        /// Session definition (TOML or JSON); the built-in session if omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// Token cap for this session
        #[arg(long)]
        max_tokens: Option<u32>,
    },
    /// Pause the session clock
    Pause,
    /// Resume a paused session
    Resume,
    /// Move to the next activity
    Next,
    /// Jump forward to an activity, completing the ones in between
    Advance {
        /// Zero-based activity index
        index: usize,
    },
    /// Award one token to the current activity
    Award,
    /// Record a success rate for an activity
    Rate {
        /// Zero-based activity index
        index: usize,
        /// Success rate, 0-100
        #[arg(allow_negative_numbers = true)]
        rate: f64,
    },
    /// Complete the current activity with a success rate
    Complete {
        /// Success rate, 0-100
        #[arg(allow_negative_numbers = true)]
        rate: f64,
    },
    /// Report an attempt in the current activity
    Attempt,
    /// Report the outcome of the last attempt
    Success {
        #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        did_succeed: bool,
    },
    /// Claim a reward the current tokens afford
    Claim {
        /// Reward id (see `questline config get rewards`)
        reward: String,
    },
    /// End the session and print its summary
    End,
    /// Print the current session state as JSON
    Status,
    /// Drop the saved session without archiving a summary
    Discard,
}

pub(crate) type Engine = SessionEngine<SystemClock>;

pub(crate) fn load_session_config(
    path: Option<PathBuf>,
) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(SessionConfig::from_path(&path)?),
        None => Ok(SessionConfig::default()),
    }
}

fn load_engine(db: &Database) -> Result<Option<Engine>, Box<dyn std::error::Error>> {
    let Some(json) = db.kv_get(ENGINE_KEY)? else {
        return Ok(None);
    };
    match serde_json::from_str::<SessionState>(&json) {
        Ok(state) => Ok(Some(SessionEngine::from_state(state, SystemClock))),
        Err(e) => {
            tracing::warn!(error = %e, "discarding unreadable saved session");
            Ok(None)
        }
    }
}

fn save_engine(db: &Database, engine: &Engine) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(engine.state())?;
    db.kv_set(ENGINE_KEY, &json)?;
    Ok(())
}

/// Archive the summary when this invocation ended the session.
pub(crate) fn archive_if_ended(
    db: &Database,
    before: SessionPhase,
    engine: &Engine,
) -> Result<(), Box<dyn std::error::Error>> {
    if before != SessionPhase::Ended && engine.phase() == SessionPhase::Ended {
        if let Some(summary) = engine.summary() {
            db.record_summary(summary)?;
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn new_engine(
    config: Option<PathBuf>,
    max_tokens: Option<u32>,
) -> Result<Engine, Box<dyn std::error::Error>> {
    let mut settings = Config::load()?.engine_settings();
    if let Some(max) = max_tokens {
        settings.max_tokens = max;
    }
    let session = load_session_config(config)?;
    Ok(SessionEngine::new(session, settings)?)
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    if matches!(action, SessionAction::Discard) {
        if !db.kv_delete(ENGINE_KEY)? {
            return Err("no session to discard".into());
        }
        tracing::info!("saved session discarded");
        return Ok(());
    }

    // A finished session is replaced on start.
    let is_start = matches!(action, SessionAction::Start { .. });
    let saved = load_engine(&db)?.filter(|e| !(is_start && e.phase() == SessionPhase::Ended));
    let mut engine = match (saved, &action) {
        (Some(engine), _) => engine,
        (None, SessionAction::Start { config, max_tokens }) => {
            new_engine(config.clone(), *max_tokens)?
        }
        (None, _) => return Err("no session; run `questline session start` first".into()),
    };

    let recorder = EventRecorder::new();
    engine.subscribe(recorder.clone());
    let before = engine.phase();
    let is_status = matches!(action, SessionAction::Status);
    let mut printed = false;

    match action {
        SessionAction::Start { .. } => engine.start()?,
        SessionAction::Pause => engine.pause()?,
        SessionAction::Resume => engine.resume()?,
        SessionAction::Next => {
            engine.next_activity()?;
        }
        SessionAction::Advance { index } => {
            engine.advance_activity(index)?;
        }
        SessionAction::Award => {
            engine.award_token()?;
        }
        SessionAction::Rate { index, rate } => {
            engine.record_success_rate(index, rate)?;
            if let Some(entry) = engine.ledger().get(index) {
                print_json(entry)?;
                printed = true;
            }
        }
        SessionAction::Complete { rate } => {
            engine.on_complete(rate)?;
        }
        SessionAction::Attempt => engine.on_attempt()?,
        SessionAction::Success { did_succeed } => engine.on_success(did_succeed)?,
        SessionAction::Claim { reward } => {
            engine.claim_reward(&reward)?;
        }
        SessionAction::End => {
            engine.end()?;
        }
        SessionAction::Status => {
            engine.tick();
        }
        // Handled before loading.
        SessionAction::Discard => {}
    }

    for event in recorder.take() {
        // Ticks only matter to a live display.
        if !matches!(event, Event::Tick { .. }) {
            print_json(&event)?;
            printed = true;
        }
    }
    if !printed || is_status {
        print_json(&engine.snapshot())?;
    }

    archive_if_ended(&db, before, &engine)?;
    save_engine(&db, &engine)?;
    Ok(())
}
