use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ledger::{ActivityProgress, ActivityStatus};

/// Final record of a session, produced once by `end()`.
///
/// The JSON field names are consumed by review tooling and must stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub session_name: String,
    pub elapsed_seconds: u64,
    pub activities: Vec<ActivityProgress>,
    pub tokens_earned: u32,
    pub speech_targets: BTreeSet<String>,
    pub behavior_focus: BTreeSet<String>,
    pub completion_timestamp: DateTime<Utc>,
}

impl SessionSummary {
    pub fn completed_count(&self) -> usize {
        self.activities
            .iter()
            .filter(|a| a.status == ActivityStatus::Completed)
            .count()
    }

    pub fn is_full_run(&self) -> bool {
        !self.activities.is_empty() && self.completed_count() == self.activities.len()
    }

    /// Mean of the recorded success rates, if any were recorded.
    pub fn mean_success_rate(&self) -> Option<f64> {
        let rates: Vec<f64> = self.activities.iter().filter_map(|a| a.success_rate).collect();
        if rates.is_empty() {
            return None;
        }
        Some(rates.iter().sum::<f64>() / rates.len() as f64)
    }
}
