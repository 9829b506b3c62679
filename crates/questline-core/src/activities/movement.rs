//! Movement drill: one physical action per target word, said aloud while
//! moving.

use serde::{Deserialize, Serialize};

use super::{record_success, ActivityError, ActivityHost, ActivityModule, AttemptTally, Meter};
use crate::session::{ActivityKind, Advance};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    Jump,
    Spin,
    Stomp,
    Fly,
    Roar,
    /// Any other word: say it while moving.
    Say(String),
}

impl Movement {
    pub fn from_word(word: &str) -> Self {
        match word.to_lowercase().as_str() {
            "jump" => Movement::Jump,
            "spin" => Movement::Spin,
            "stomp" => Movement::Stomp,
            "fly" => Movement::Fly,
            "roar" => Movement::Roar,
            _ => Movement::Say(word.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Movement::Jump => "Jump",
            Movement::Spin => "Spin",
            Movement::Stomp => "Stomp",
            Movement::Fly => "Fly",
            Movement::Roar => "Roar",
            Movement::Say(word) => word,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementAction {
    pub id: String,
    pub movement: Movement,
    pub target_word: String,
}

#[derive(Debug, Clone)]
pub struct MovementDrill {
    actions: Vec<MovementAction>,
    index: usize,
    tally: AttemptTally,
    energy: Meter,
    performing: bool,
    complete: bool,
}

impl MovementDrill {
    /// Builds one action per word; with no words, falls back to jump, spin
    /// and stomp.
    pub fn new<I, S>(target_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut actions: Vec<MovementAction> = target_words
            .into_iter()
            .enumerate()
            .map(|(i, word)| {
                let word = word.as_ref();
                let movement = Movement::from_word(word);
                let prefix = match movement {
                    Movement::Say(_) => "action".to_string(),
                    ref m => m.name().to_lowercase(),
                };
                MovementAction {
                    id: format!("{prefix}-{i}"),
                    movement,
                    target_word: word.to_string(),
                }
            })
            .collect();

        if actions.is_empty() {
            actions = [Movement::Jump, Movement::Spin, Movement::Stomp]
                .into_iter()
                .map(|movement| MovementAction {
                    id: format!("{}-default", movement.name().to_lowercase()),
                    target_word: movement.name().to_string(),
                    movement,
                })
                .collect();
        }

        Self {
            actions,
            index: 0,
            tally: AttemptTally::default(),
            energy: Meter::default(),
            performing: false,
            complete: false,
        }
    }

    pub fn actions(&self) -> &[MovementAction] {
        &self.actions
    }

    pub fn current_action(&self) -> &MovementAction {
        &self.actions[self.index]
    }

    pub fn energy(&self) -> f64 {
        self.energy.value()
    }

    pub fn is_performing(&self) -> bool {
        self.performing
    }

    /// Countdown finished; the child is moving.
    pub fn begin_action(&mut self) -> Result<(), ActivityError> {
        self.ensure_open()?;
        self.performing = true;
        Ok(())
    }

    pub fn complete_action(
        &mut self,
        host: &mut dyn ActivityHost,
        success: bool,
    ) -> Result<(), ActivityError> {
        self.ensure_open()?;
        host.on_attempt()?;
        self.performing = false;
        self.tally.attempts += 1;
        if success {
            let step = 100.0 / self.actions.len() as f64;
            record_success(host, &mut self.tally, &mut self.energy, step)
        } else {
            host.on_success(false)?;
            Ok(())
        }
    }

    pub fn next_action(&mut self, host: &mut dyn ActivityHost) -> Result<Option<Advance>, ActivityError> {
        self.ensure_open()?;
        if self.index + 1 < self.actions.len() {
            self.index += 1;
            return Ok(None);
        }
        let advance = host.on_complete(self.tally.success_rate())?;
        self.complete = true;
        self.performing = false;
        Ok(Some(advance))
    }

    fn ensure_open(&self) -> Result<(), ActivityError> {
        if self.complete {
            Err(ActivityError::AlreadyComplete)
        } else {
            Ok(())
        }
    }
}

impl ActivityModule for MovementDrill {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Movement
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn tally(&self) -> AttemptTally {
        self.tally
    }
}
