//! Cleanup command: delete old records from the focus log.

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate, NaiveTime};
use tgl_db::Database;

use crate::day;

/// Flags controlling a cleanup run.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Delete records more than this many days old.
    pub older_than: i64,
    /// Delete records from before this date instead.
    pub before: Option<String>,
    /// Delete unconsumed records too.
    pub all: bool,
}

pub fn run(db: &mut Database, options: &Options) -> Result<()> {
    let date = cutoff_date(options, Local::now().date_naive())?;
    let cutoff = day::local_to_epoch(date.and_time(NaiveTime::MIN));
    tracing::info!(%date, all = options.all, "purging old records");

    let deleted = db
        .purge_before(cutoff, options.all)
        .context("failed to purge records")?;
    println!("Deleted {deleted} events recorded before {date}");
    Ok(())
}

/// Local midnight of `--before` wins over the `--older-than` day count.
fn cutoff_date(options: &Options, today: NaiveDate) -> Result<NaiveDate> {
    match &options.before {
        Some(spec) => day::parse_date(spec),
        None => Ok(today - Duration::days(options.older_than)),
    }
}
