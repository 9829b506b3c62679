//! Per-activity progress ledger, index-aligned with the activity catalog.

use serde::{Deserialize, Serialize};

use super::catalog::ActivityCatalog;
use crate::error::{SessionError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Coarse grouping of a success rate, used by review surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessBand {
    /// 80% and above
    Strong,
    /// 60% to 80%
    Developing,
    /// Below 60%
    Emerging,
}

impl SuccessBand {
    pub fn of(rate: f64) -> Self {
        if rate >= 80.0 {
            SuccessBand::Strong
        } else if rate >= 60.0 {
            SuccessBand::Developing
        } else {
            SuccessBand::Emerging
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityProgress {
    pub activity_id: String,
    pub name: String,
    pub status: ActivityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
    pub tokens_earned: u32,
}

impl ActivityProgress {
    pub fn success_band(&self) -> Option<SuccessBand> {
        self.success_rate.map(SuccessBand::of)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressLedger {
    entries: Vec<ActivityProgress>,
}

impl ProgressLedger {
    /// One `NotStarted` entry per catalog activity, in catalog order.
    pub fn for_catalog(catalog: &ActivityCatalog) -> Self {
        let entries = catalog
            .iter()
            .map(|activity| ActivityProgress {
                activity_id: activity.id.clone(),
                name: activity.name.clone(),
                status: ActivityStatus::NotStarted,
                success_rate: None,
                tokens_earned: 0,
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ActivityProgress] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ActivityProgress> {
        self.entries.get(index)
    }

    pub fn status_of(&self, index: usize) -> Result<ActivityStatus, SessionError> {
        Ok(self.entry(index)?.status)
    }

    pub fn mark_in_progress(&mut self, index: usize) -> Result<(), SessionError> {
        self.entry_mut(index)?.status = ActivityStatus::InProgress;
        Ok(())
    }

    pub fn mark_completed(&mut self, index: usize) -> Result<(), SessionError> {
        self.entry_mut(index)?.status = ActivityStatus::Completed;
        Ok(())
    }

    /// Sets the success rate; the last write wins.
    pub fn set_success_rate(&mut self, index: usize, rate: f64) -> Result<(), SessionError> {
        validate_rate(rate)?;
        self.entry_mut(index)?.success_rate = Some(rate);
        Ok(())
    }

    pub fn add_tokens(&mut self, index: usize, n: u32) -> Result<(), SessionError> {
        let entry = self.entry_mut(index)?;
        entry.tokens_earned = entry.tokens_earned.saturating_add(n);
        Ok(())
    }

    pub fn completed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == ActivityStatus::Completed)
            .count()
    }

    pub fn in_progress_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.status == ActivityStatus::InProgress)
    }

    pub fn total_tokens(&self) -> u32 {
        self.entries.iter().map(|e| e.tokens_earned).sum()
    }

    /// 0.0 .. 100.0 share of completed activities.
    pub fn completion_percent(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        self.completed_count() as f64 / self.entries.len() as f64 * 100.0
    }

    fn entry(&self, index: usize) -> Result<&ActivityProgress, SessionError> {
        let len = self.entries.len();
        self.entries
            .get(index)
            .ok_or(SessionError::Index { index, len })
    }

    fn entry_mut(&mut self, index: usize) -> Result<&mut ActivityProgress, SessionError> {
        let len = self.entries.len();
        self.entries
            .get_mut(index)
            .ok_or(SessionError::Index { index, len })
    }
}

/// Success rates are percentages in `[0, 100]`.
pub fn validate_rate(rate: f64) -> Result<(), ValidationError> {
    if rate.is_finite() && (0.0..=100.0).contains(&rate) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: "success_rate",
            value: rate,
            min: 0.0,
            max: 100.0,
        })
    }
}
