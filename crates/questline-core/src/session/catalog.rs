use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Speech,
    Movement,
    Expert,
    Break,
    Reward,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDescriptor {
    pub id: String,
    pub name: String,
    pub kind: ActivityKind,
    /// Planned duration in minutes.
    pub duration_min: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<i32>,
}

impl ActivityDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ActivityKind, duration_min: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            duration_min,
            targets: None,
            difficulty: None,
        }
    }

    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_difficulty(mut self, difficulty: i32) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    /// Planned duration in seconds.
    ///
    /// Uses saturating arithmetic to prevent overflow with large values.
    pub fn duration_secs(&self) -> u64 {
        self.duration_min.saturating_mul(60)
    }
}

/// Ordered activity list for one session. Read-only once the session runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityCatalog {
    activities: Vec<ActivityDescriptor>,
}

impl ActivityCatalog {
    pub fn new(activities: Vec<ActivityDescriptor>) -> Self {
        Self { activities }
    }

    /// The default session from the setup screen.
    pub fn default_session() -> Self {
        Self::new(vec![
            ActivityDescriptor::new("greeting", "Dragon Greeting", ActivityKind::Speech, 5),
            ActivityDescriptor::new("speech-quest", "Speech Quest", ActivityKind::Speech, 10),
            ActivityDescriptor::new("movement", "Movement Break", ActivityKind::Movement, 3),
            ActivityDescriptor::new("expert-role", "Expert Role-Play", ActivityKind::Expert, 8),
            ActivityDescriptor::new("dragons-den", "Dragon's Den", ActivityKind::Break, 3),
            ActivityDescriptor::new("speech-quest-2", "Speech Quest 2", ActivityKind::Speech, 10),
            ActivityDescriptor::new("token-exchange", "Token Exchange", ActivityKind::Reward, 5),
        ])
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ActivityDescriptor> {
        self.activities.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityDescriptor> {
        self.activities.iter()
    }

    pub fn total_duration_min(&self) -> u64 {
        self.activities.iter().map(|a| a.duration_min).sum()
    }

    /// Checks that the sequence can be started: non-empty, unique ids,
    /// every planned duration positive.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.activities.is_empty() {
            return Err(SessionError::Configuration(
                "activity sequence is empty".into(),
            ));
        }
        let mut seen = HashSet::new();
        for (index, activity) in self.activities.iter().enumerate() {
            if activity.id.trim().is_empty() {
                return Err(SessionError::Configuration(format!(
                    "activity {index} has an empty id"
                )));
            }
            if !seen.insert(activity.id.as_str()) {
                return Err(SessionError::Configuration(format!(
                    "duplicate activity id '{}'",
                    activity.id
                )));
            }
            if activity.duration_min == 0 {
                return Err(SessionError::Configuration(format!(
                    "activity '{}' has a zero planned duration",
                    activity.id
                )));
            }
        }
        Ok(())
    }
}

impl From<Vec<ActivityDescriptor>> for ActivityCatalog {
    fn from(activities: Vec<ActivityDescriptor>) -> Self {
        Self::new(activities)
    }
}
