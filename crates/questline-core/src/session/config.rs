//! Session configuration handed to the engine by an external configurator.
//!
//! Configs are read from a TOML or JSON file, or taken from
//! [`SessionConfig::default`]. Nothing here is ever written back.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::catalog::ActivityCatalog;
use crate::error::{ConfigError, CoreError};

/// Presentational colors carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            primary: "#9c27b0".into(),
            secondary: "#e91e63".into(),
            accent: "#f48fb1".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub id: String,
    pub name: String,
    /// Planned total duration in minutes. Omitted or zero in a file means
    /// the sum of the activity durations.
    #[serde(default)]
    pub duration_min: u64,
    pub activities: ActivityCatalog,
    #[serde(default)]
    pub speech_targets: BTreeSet<String>,
    #[serde(default)]
    pub behavior_focus: BTreeSet<String>,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub color_scheme: ColorScheme,
}

fn default_theme() -> String {
    "dragon".into()
}

impl SessionConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, activities: ActivityCatalog) -> Self {
        let duration_min = activities.total_duration_min();
        Self {
            id: id.into(),
            name: name.into(),
            duration_min,
            activities,
            speech_targets: BTreeSet::new(),
            behavior_focus: BTreeSet::new(),
            theme: default_theme(),
            color_scheme: ColorScheme::default(),
        }
    }

    pub fn with_speech_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.speech_targets = targets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_behavior_focus<I, S>(mut self, focus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.behavior_focus = focus.into_iter().map(Into::into).collect();
        self
    }

    /// Planned duration in seconds.
    pub fn duration_secs(&self) -> u64 {
        self.duration_min.saturating_mul(60)
    }

    /// Read a config from disk. `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn from_path(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let mut config: SessionConfig = if is_json {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };
        if config.duration_min == 0 {
            config.duration_min = config.activities.total_duration_min();
        }
        Ok(config)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(
            format!("session-{}", uuid::Uuid::new_v4()),
            "Dragon Kingdom Adventure",
            ActivityCatalog::default_session(),
        )
        .with_speech_targets(["Final Consonants", "Consonant Blends"])
        .with_behavior_focus(["Engagement", "Boundaries"])
    }
}
