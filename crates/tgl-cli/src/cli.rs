//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Day;

/// Turn a window focus log into Toggl time entries.
///
/// Classifies logged focus events against per-process rules, compresses
/// them into billable intervals, and submits them one day at a time.
#[derive(Debug, Parser)]
#[command(name = "tgl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Classify, compress, and submit a day of focus events to Toggl.
    Submit {
        /// Day to process, overriding the configured default.
        day: Option<Day>,

        /// Specific date to process, `[yy]yy-mm-dd`.
        #[arg(long)]
        date: Option<String>,

        /// Dry run: print the summary without submitting anything.
        #[arg(long)]
        local: bool,

        /// Write an HTML preview of the day's events.
        #[arg(long)]
        render: bool,

        /// Workspace (numeric id or name) for new projects and entries.
        #[arg(long)]
        workspace: Option<String>,

        /// Ignore events shorter than this many seconds.
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
        min_seconds: Option<i64>,

        /// Hour at which one day rolls over into the next.
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=23))]
        day_ends_at: Option<u32>,
    },

    /// Print the day's per-project summary without submitting anything.
    Show {
        /// Day to process, overriding the configured default.
        day: Option<Day>,

        /// Specific date to process, `[yy]yy-mm-dd`.
        #[arg(long)]
        date: Option<String>,
    },

    /// Clear the consumed flag for a day so it can be submitted again.
    Reset {
        /// Day to reset, overriding the configured default.
        day: Option<Day>,

        /// Specific date to reset, `[yy]yy-mm-dd`.
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete old events from the database.
    Cleanup {
        /// Delete events more than this many days old.
        #[arg(long, default_value_t = 2, conflicts_with = "before")]
        older_than: i64,

        /// Delete events recorded before this date, `[yy]yy-mm-dd`.
        #[arg(long)]
        before: Option<String>,

        /// Also delete events that were never submitted.
        #[arg(long)]
        all: bool,
    },
}
