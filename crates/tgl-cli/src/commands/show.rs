//! Show command: print a day's per-project summary without touching Toggl.

use anyhow::Result;
use tgl_core::Ruleset;
use tgl_db::Database;

use crate::config::Config;
use crate::day::DayWindow;

use super::util;

pub fn run(db: &Database, config: &Config, ruleset: &Ruleset, window: DayWindow) -> Result<()> {
    let events = util::compressed_events(db, ruleset, window, config.minimum_event_seconds)?;
    if events.is_empty() {
        println!("No events!");
        return Ok(());
    }

    let projects = util::group_by_project(events);
    print!("{}", util::format_summary(&projects));
    Ok(())
}
