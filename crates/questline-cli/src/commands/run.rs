//! Interactive session: a live ticker plus line commands on stdin.
//!
//! Events are printed to stdout as one JSON object per line. Prompts and
//! errors go to stderr. While the current activity is a break, a guided
//! calming break runs alongside it and finishes the activity when its time
//! is up.

use std::path::PathBuf;

use questline_core::activities::CalmingBreak;
use questline_core::session::{
    format_clock, ActivityDescriptor, ActivityKind, Clock, SessionEngine, SessionPhase, Ticker,
};
use questline_core::{Config, Database, Event};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::session::{archive_if_ended, load_session_config};

const HELP: &str = "commands: pause | resume | next | advance N | award | attempt | \
success yes|no | complete RATE | rate N RATE | claim REWARD | extend | end-break | \
status | end | help";

enum Command {
    Pause,
    Resume,
    Next,
    Advance(usize),
    Award,
    Attempt,
    Success(bool),
    Complete(f64),
    Rate(usize, f64),
    Claim(String),
    Extend,
    EndBreak,
    Status,
    End,
    Help,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let mut arg = |what: &str| {
        parts
            .next()
            .map(str::to_string)
            .ok_or_else(|| format!("{name}: missing {what}"))
    };
    let number = |s: String| s.parse::<f64>().map_err(|e| format!("{s}: {e}"));
    let index = |s: String| s.parse::<usize>().map_err(|e| format!("{s}: {e}"));

    let command = match name {
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "next" => Command::Next,
        "advance" => Command::Advance(index(arg("index")?)?),
        "award" => Command::Award,
        "attempt" => Command::Attempt,
        "success" => match arg("yes|no")?.as_str() {
            "yes" | "y" | "true" => Command::Success(true),
            "no" | "n" | "false" => Command::Success(false),
            other => return Err(format!("success: expected yes or no, got '{other}'")),
        },
        "complete" => Command::Complete(number(arg("rate")?)?),
        "rate" => {
            let i = index(arg("index")?)?;
            Command::Rate(i, number(arg("rate")?)?)
        }
        "claim" => Command::Claim(arg("reward")?),
        "extend" => Command::Extend,
        "end-break" => Command::EndBreak,
        "status" => Command::Status,
        "end" | "quit" | "exit" => Command::End,
        "help" | "?" => Command::Help,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(command)
}

/// Calming break tied to the activity index it guides.
struct BreakGuide {
    index: usize,
    calm: CalmingBreak,
}

/// A running session with its break guide.
struct Live<C: Clock> {
    engine: SessionEngine<C>,
    config: Config,
    guide: Option<BreakGuide>,
}

impl<C: Clock> Live<C> {
    fn new(engine: SessionEngine<C>, config: Config) -> Self {
        let mut live = Self {
            engine,
            config,
            guide: None,
        };
        live.sync_break();
        live
    }

    /// Starts a guide when a break activity begins and drops it once the
    /// session moves on.
    fn sync_break(&mut self) {
        let index = self.engine.current_index();
        let duration_secs = match self.engine.current_activity() {
            Some(activity)
                if activity.kind == ActivityKind::Break
                    && self.engine.phase() != SessionPhase::Ended =>
            {
                activity.duration_min * 60
            }
            _ => {
                self.guide = None;
                return;
            }
        };
        if self.guide.as_ref().is_some_and(|g| g.index == index) {
            return;
        }
        tracing::debug!(index, duration_secs, "calming break started");
        self.guide = Some(BreakGuide {
            index,
            calm: self.config.calming_break(duration_secs, self.engine.now()),
        });
    }

    fn guide_mut(&mut self) -> Result<&mut BreakGuide, Box<dyn std::error::Error>> {
        self.guide
            .as_mut()
            .ok_or_else(|| "no break in progress".into())
    }

    fn on_tick(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.engine.tick();
        if self.engine.phase() == SessionPhase::Running {
            if let Some(guide) = self.guide.as_mut() {
                let now = self.engine.now();
                guide.calm.poll(&mut self.engine, now)?;
            }
        }
        self.sync_break();
        Ok(())
    }

    fn apply(&mut self, command: Command) -> Result<(), Box<dyn std::error::Error>> {
        let engine = &mut self.engine;
        match command {
            Command::Pause => engine.pause()?,
            Command::Resume => engine.resume()?,
            Command::Next => {
                engine.next_activity()?;
            }
            Command::Advance(index) => {
                engine.advance_activity(index)?;
            }
            Command::Award => {
                engine.award_token()?;
            }
            Command::Attempt => engine.on_attempt()?,
            Command::Success(did_succeed) => engine.on_success(did_succeed)?,
            Command::Complete(rate) => {
                engine.on_complete(rate)?;
            }
            Command::Rate(index, rate) => engine.record_success_rate(index, rate)?,
            Command::Claim(reward) => {
                engine.claim_reward(&reward)?;
            }
            Command::Extend => {
                let now = engine.now();
                let remaining = self.guide_mut()?.calm.extend(now)?;
                println!("{}", json!({ "type": "break_extended", "remaining_secs": remaining }));
            }
            Command::EndBreak => {
                let guide = self.guide.as_mut().ok_or("no break in progress")?;
                guide.calm.end_early(&mut self.engine)?;
            }
            Command::Status => {
                println!("{}", serde_json::to_string(&self.engine.snapshot())?);
                if let Some(status) = self.break_status() {
                    println!("{status}");
                }
            }
            Command::End => {
                engine.end()?;
            }
            Command::Help => eprintln!("{HELP}"),
        }
        self.sync_break();
        Ok(())
    }

    fn break_status(&self) -> Option<serde_json::Value> {
        let guide = self.guide.as_ref()?;
        let now = self.engine.now();
        Some(json!({
            "type": "break_status",
            "remaining_secs": guide.calm.remaining_secs(now),
            "breath_phase": guide.calm.breath_phase(now),
            "breath_count": guide.calm.breath_count(now),
            "progress_percent": guide.calm.progress_percent(now),
        }))
    }

    fn status_line(&self) -> String {
        let engine = &self.engine;
        let name = |a: Option<&ActivityDescriptor>| {
            a.map(|a| a.name.clone()).unwrap_or_else(|| "-".into())
        };
        format!(
            "[{}] {} (next: {}) | {} left | tokens {}/{}",
            format_clock(engine.elapsed_seconds()),
            name(engine.current_activity()),
            name(engine.upcoming_activity()),
            format_clock(engine.remaining_seconds()),
            engine.token_count(),
            engine.tokens().max(),
        )
    }
}

async fn run_loop(config: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let app_config = Config::load()?;
    let session = load_session_config(config)?;
    let db = Database::open()?;

    let mut engine = SessionEngine::new(session, app_config.engine_settings())?;
    let (tx, mut events) = mpsc::unbounded_channel::<Event>();
    engine.subscribe(tx);
    engine.start()?;
    eprintln!("{HELP}");

    let mut ticker = Ticker::spawn(app_config.tick_interval());
    let mut live = Live::new(engine, app_config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Some(()) = ticker.tick() => {
                if let Err(e) = live.on_tick() {
                    eprintln!("error: {e}");
                }
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => {
                        let result = parse_command(&line)
                            .map_err(Into::into)
                            .and_then(|command| live.apply(command));
                        if let Err(e) = result {
                            eprintln!("error: {e}");
                        }
                    }
                    // stdin closed: wrap up.
                    None => {
                        if live.engine.phase() != SessionPhase::Ended {
                            live.engine.end()?;
                        }
                    }
                }
            }
        }

        while let Ok(event) = events.try_recv() {
            match event {
                Event::Tick { .. } => tracing::trace!("{}", live.status_line()),
                event => println!("{}", serde_json::to_string(&event)?),
            }
        }

        if live.engine.phase() == SessionPhase::Ended {
            break;
        }
    }

    ticker.stop();
    archive_if_ended(&db, SessionPhase::Running, &live.engine)?;
    if let Some(summary) = live.engine.summary() {
        let mean = summary
            .mean_success_rate()
            .map(|rate| format!("{rate:.0}%"))
            .unwrap_or_else(|| "n/a".into());
        eprintln!(
            "finished {}/{} activities, {} tokens, mean success {mean}",
            summary.completed_count(),
            summary.activities.len(),
            summary.tokens_earned,
        );
    }
    Ok(())
}

pub fn run(config: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_loop(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use questline_core::session::{
        ActivityCatalog, ActivityDescriptor, ActivityStatus, EngineSettings, ManualClock,
        SessionConfig,
    };

    fn live_with_break(config: Config) -> (Live<ManualClock>, ManualClock) {
        let activities = ActivityCatalog::new(vec![
            ActivityDescriptor::new("warmup", "Warm Up", ActivityKind::Speech, 1),
            ActivityDescriptor::new("den", "Dragon's Den", ActivityKind::Break, 1),
            ActivityDescriptor::new("wrap", "Wrap Up", ActivityKind::Movement, 1),
        ]);
        let clock = ManualClock::default();
        let mut engine = SessionEngine::with_clock(
            SessionConfig::new("run-test", "Run Test", activities),
            EngineSettings::default(),
            clock.clone(),
        )
        .unwrap();
        engine.start().unwrap();
        (Live::new(engine, config), clock)
    }

    #[test]
    fn parses_commands_with_arguments() {
        assert!(matches!(parse_command("advance 3"), Ok(Command::Advance(3))));
        assert!(matches!(parse_command("success no"), Ok(Command::Success(false))));
        assert!(matches!(parse_command("rate 1 72.5"), Ok(Command::Rate(1, r)) if r == 72.5));
        assert!(matches!(parse_command("claim reward-2"), Ok(Command::Claim(id)) if id == "reward-2"));
        assert!(matches!(parse_command("extend"), Ok(Command::Extend)));
        assert!(matches!(parse_command("end-break"), Ok(Command::EndBreak)));
        assert!(matches!(parse_command("quit"), Ok(Command::End)));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("advance").is_err());
        assert!(parse_command("advance two").is_err());
        assert!(parse_command("success maybe").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn break_guide_follows_the_current_activity() {
        let (mut live, _) = live_with_break(Config::default());
        assert!(live.guide.is_none());
        assert!(live.apply(Command::Extend).is_err());

        live.apply(Command::Next).unwrap();
        assert_eq!(live.guide.as_ref().map(|g| g.index), Some(1));

        live.apply(Command::Next).unwrap();
        assert!(live.guide.is_none());
    }

    #[test]
    fn configured_extension_delays_break_completion() {
        let mut config = Config::default();
        config.update("breaks.extension_secs", "45").unwrap();
        let (mut live, clock) = live_with_break(config);
        live.apply(Command::Next).unwrap();
        live.apply(Command::Extend).unwrap();

        clock.advance_secs(60);
        live.on_tick().unwrap();
        assert_eq!(live.engine.current_index(), 1);

        clock.advance_secs(45);
        live.on_tick().unwrap();
        assert_eq!(live.engine.current_index(), 2);
        assert_eq!(live.engine.ledger().get(1).unwrap().status, ActivityStatus::Completed);
        assert_eq!(live.engine.ledger().get(1).unwrap().success_rate, None);
        assert!(live.guide.is_none());
    }

    #[test]
    fn paused_session_does_not_finish_break() {
        let (mut live, clock) = live_with_break(Config::default());
        live.apply(Command::Next).unwrap();
        live.apply(Command::Pause).unwrap();
        clock.advance_secs(120);
        live.on_tick().unwrap();
        assert_eq!(live.engine.current_index(), 1);
        assert!(live.guide.is_some());
    }

    #[test]
    fn end_break_completes_the_activity_early() {
        let (mut live, _) = live_with_break(Config::default());
        live.apply(Command::Next).unwrap();
        live.apply(Command::EndBreak).unwrap();
        assert_eq!(live.engine.current_index(), 2);
        assert!(live.apply(Command::EndBreak).is_err());
    }

    #[test]
    fn status_line_names_the_upcoming_activity() {
        let (live, _) = live_with_break(Config::default());
        let line = live.status_line();
        assert!(line.contains("Warm Up (next: Dragon's Den)"), "{line}");
    }
}
