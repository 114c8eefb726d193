//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::ValueEnum;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use serde::{Deserialize, Serialize};
use tgl_core::{RuleDef, Ruleset};

/// Which day a run processes when no explicit date is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Today,
    Yesterday,
}

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the focus-log database.
    pub database_path: PathBuf,

    /// Toggl API token. Only required for submission; dry runs and local
    /// commands work without it.
    pub api_token: String,

    /// Workspace new projects and entries go to, as a numeric id or a name.
    pub workspace: String,

    /// Day to process when neither a day keyword nor `--date` is given.
    pub default_day: Day,

    /// Events shorter than this many seconds are merged into the ongoing
    /// event or dropped.
    pub minimum_event_seconds: i64,

    /// Hour at which one day rolls over into the next. A "day" with
    /// `day_ends_at = 3` runs from 03:00 to 03:00 the next morning.
    pub day_ends_at: u32,

    /// Per-process classification rules.
    pub project_definitions: Vec<RuleDef>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("api_token", &"[REDACTED]")
            .field("workspace", &self.workspace)
            .field("default_day", &self.default_day)
            .field("minimum_event_seconds", &self.minimum_event_seconds)
            .field("day_ends_at", &self.day_ends_at)
            .field("project_definitions", &self.project_definitions.len())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("tgl.db"),
            api_token: String::new(),
            workspace: String::new(),
            default_day: Day::Yesterday,
            minimum_event_seconds: 60, // anything shorter is noise
            day_ends_at: 3,            // late nights count towards the previous day
            project_definitions: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Json::file(config_dir.join("config.json")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Json::file(path));
        }

        // Load from environment variables (TGL_*)
        figment = figment.merge(Env::prefixed("TGL_"));

        figment.extract()
    }

    /// Checks value ranges and compiles the classification ruleset.
    pub fn validate(&self) -> anyhow::Result<Ruleset> {
        anyhow::ensure!(
            self.day_ends_at <= 23,
            "day_ends_at must be an hour between 0 and 23, got {}",
            self.day_ends_at
        );
        anyhow::ensure!(
            self.minimum_event_seconds >= 0,
            "minimum_event_seconds cannot be negative, got {}",
            self.minimum_event_seconds
        );
        let ruleset = Ruleset::compile(&self.project_definitions)
            .context("invalid project definitions")?;
        if ruleset.is_empty() {
            tracing::warn!("no project definitions configured, no events will be classified");
        }
        Ok(ruleset)
    }
}

/// Returns the platform-specific config directory for tgl.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tgl"))
}

/// Returns the platform-specific data directory for tgl.
///
/// On Linux: `~/.local/share/tgl`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("tgl"))
}
