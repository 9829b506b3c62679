//! Role-play drill: the child plays the expert and explains facts about a
//! topic; each explanation gets a clarity score from 1 to 5.

use serde::{Deserialize, Serialize};

use super::{record_success, ActivityError, ActivityHost, ActivityModule, AttemptTally, Meter};
use crate::session::{ActivityKind, Advance};

/// Facts this far above the drill difficulty are left out.
const DIFFICULTY_HEADROOM: u8 = 2;
const MAX_DIFFICULTY: u8 = 5;
/// Lowest clarity score that counts as a success.
pub const CLEAR_EXPLANATION: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicFact {
    pub id: String,
    pub fact: String,
    pub difficulty: u8,
}

impl TopicFact {
    pub fn new(id: impl Into<String>, fact: impl Into<String>, difficulty: u8) -> Self {
        Self {
            id: id.into(),
            fact: fact.into(),
            difficulty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RolePlayDrill {
    topic: String,
    difficulty: u8,
    facts: Vec<TopicFact>,
    index: usize,
    tally: AttemptTally,
    expert: Meter,
    complete: bool,
}

impl RolePlayDrill {
    pub fn new(
        topic: impl Into<String>,
        facts: Vec<TopicFact>,
        difficulty: u8,
    ) -> Result<Self, ActivityError> {
        let limit = difficulty.saturating_add(DIFFICULTY_HEADROOM);
        let facts: Vec<TopicFact> = facts.into_iter().filter(|f| f.difficulty <= limit).collect();
        if facts.is_empty() {
            return Err(ActivityError::NoItems("role-play drill"));
        }
        Ok(Self {
            topic: topic.into(),
            difficulty,
            facts,
            index: 0,
            tally: AttemptTally::default(),
            expert: Meter::default(),
            complete: false,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn facts(&self) -> &[TopicFact] {
        &self.facts
    }

    pub fn current_fact(&self) -> &TopicFact {
        &self.facts[self.index]
    }

    pub fn expert_level(&self) -> f64 {
        self.expert.value()
    }

    /// Score the current explanation. Level 3 and above counts as clear.
    pub fn mark_clarity(&mut self, host: &mut dyn ActivityHost, level: u8) -> Result<(), ActivityError> {
        self.ensure_open()?;
        host.on_attempt()?;
        self.tally.attempts += 1;
        if level >= CLEAR_EXPLANATION {
            let step = 100.0 / (self.facts.len() * 2) as f64;
            record_success(host, &mut self.tally, &mut self.expert, step)
        } else {
            host.on_success(false)?;
            Ok(())
        }
    }

    pub fn next_fact(&mut self, host: &mut dyn ActivityHost) -> Result<Option<Advance>, ActivityError> {
        self.ensure_open()?;
        if self.index + 1 < self.facts.len() {
            self.index += 1;
            return Ok(None);
        }
        let advance = host.on_complete(self.tally.success_rate())?;
        self.complete = true;
        Ok(Some(advance))
    }

    /// Appends a fact the child brought up themselves.
    pub fn add_fact(&mut self, fact: impl Into<String>) -> Result<&TopicFact, ActivityError> {
        self.ensure_open()?;
        let id = format!("custom-{}", self.facts.len());
        self.facts
            .push(TopicFact::new(id, fact, self.difficulty.min(MAX_DIFFICULTY)));
        Ok(&self.facts[self.facts.len() - 1])
    }

    fn ensure_open(&self) -> Result<(), ActivityError> {
        if self.complete {
            Err(ActivityError::AlreadyComplete)
        } else {
            Ok(())
        }
    }
}

impl ActivityModule for RolePlayDrill {
    fn kind(&self) -> ActivityKind {
        ActivityKind::Expert
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn tally(&self) -> AttemptTally {
        self.tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activities::testing::RecordingHost;

    fn dragon_facts() -> Vec<TopicFact> {
        vec![
            TopicFact::new("f1", "Dragons breathe fire", 1),
            TopicFact::new("f2", "Dragons guard treasure", 2),
            TopicFact::new("f3", "Dragon scales are harder than steel", 5),
        ]
    }

    #[test]
    fn filters_facts_above_difficulty() {
        let drill = RolePlayDrill::new("dragons", dragon_facts(), 1).unwrap();
        let ids: Vec<_> = drill.facts().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["f1", "f2"]);

        let all = RolePlayDrill::new("dragons", dragon_facts(), 3).unwrap();
        assert_eq!(all.facts().len(), 3);
    }

    #[test]
    fn no_fitting_facts_is_rejected() {
        let facts = vec![TopicFact::new("hard", "Very hard", 5)];
        assert_eq!(
            RolePlayDrill::new("dragons", facts, 1).unwrap_err(),
            ActivityError::NoItems("role-play drill")
        );
    }

    #[test]
    fn clarity_threshold_decides_success() {
        let mut host = RecordingHost::default();
        let mut drill = RolePlayDrill::new("dragons", dragon_facts(), 1).unwrap();
        drill.mark_clarity(&mut host, 2).unwrap();
        drill.mark_clarity(&mut host, 3).unwrap();
        assert_eq!(host.outcomes, [false, true]);
        assert_eq!(host.attempts, 2);
        assert_eq!(drill.tally(), AttemptTally { attempts: 2, successes: 1 });
        // Two facts: each clear explanation adds a quarter.
        assert_eq!(drill.expert_level(), 25.0);
        assert_eq!(host.tokens, 1);
    }

    #[test]
    fn add_fact_caps_difficulty_and_extends_drill() {
        let mut drill = RolePlayDrill::new("dragons", dragon_facts(), 9).unwrap();
        let added = drill.add_fact("Dragons like naps").unwrap().clone();
        assert_eq!(added.id, "custom-3");
        assert_eq!(added.difficulty, 5);
        assert_eq!(drill.facts().len(), 4);
    }

    #[test]
    fn completes_after_last_fact() {
        let mut host = RecordingHost::default();
        let mut drill = RolePlayDrill::new("dragons", dragon_facts(), 1).unwrap();
        drill.mark_clarity(&mut host, 5).unwrap();
        assert_eq!(drill.next_fact(&mut host).unwrap(), None);
        assert_eq!(drill.current_fact().id, "f2");
        assert!(drill.next_fact(&mut host).unwrap().is_some());
        assert!(drill.is_complete());
        assert_eq!(host.completed_with, [Some(100.0)]);
        assert_eq!(
            drill.add_fact("late").unwrap_err(),
            ActivityError::AlreadyComplete
        );
    }
}
