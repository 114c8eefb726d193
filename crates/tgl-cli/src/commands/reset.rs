//! Reset command: clear the consumed flags for one day so its events can be
//! compressed and submitted again.

use anyhow::{Context, Result};
use tgl_db::Database;

use crate::day::DayWindow;

pub fn run(db: &mut Database, window: DayWindow) -> Result<()> {
    let (start, end) = window.query_bounds();
    let reset = db
        .reset_consumed(start, end)
        .context("failed to reset events")?;
    println!("Reset {reset} events for {}", window.date);
    Ok(())
}
