//! Date selection and day-window math.
//!
//! A "day" does not start at midnight: with `day_ends_at = 3`, the day for
//! 2018-01-30 covers 03:00 on the 30th to 03:00 on the 31st, local time.
//! Storage works in epoch seconds, so window bounds are epochs too.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use regex::Regex;

use crate::config::Day;

/// Accepts `[yy]yy-mm-dd` with `-`, `.`, or `/` separators.
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2})?(\d{2})[./-](\d{2})[./-](\d{2})$").unwrap()
});

/// Parses a date argument. Two-digit years mean 20xx: `15-10-02` is
/// 2015-10-02.
pub fn parse_date(spec: &str) -> Result<NaiveDate> {
    let caps = DATE_RE.captures(spec).with_context(|| {
        format!("unrecognized date {spec:?}, expected [yy]yy-mm-dd")
    })?;

    let century = caps.get(1).map_or("20", |m| m.as_str());
    let year: i32 = format!("{century}{}", &caps[2])
        .parse()
        .context("failed to parse year")?;
    let month: u32 = caps[3].parse().context("failed to parse month")?;
    let day: u32 = caps[4].parse().context("failed to parse day")?;

    NaiveDate::from_ymd_opt(year, month, day)
        .with_context(|| format!("{spec:?} is not a valid calendar date"))
}

/// Resolves which date a run should process.
///
/// An explicit `--date` wins; then a `today`/`yesterday` keyword from the
/// command line; then the configured default day.
pub fn effective_date(
    day: Option<Day>,
    date: Option<&str>,
    default_day: Day,
    today: NaiveDate,
) -> Result<NaiveDate> {
    if let Some(spec) = date {
        return parse_date(spec);
    }
    Ok(match day.unwrap_or(default_day) {
        Day::Today => today,
        Day::Yesterday => today - Duration::days(1),
    })
}

/// Epoch bounds of one day, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    /// Calendar day the window belongs to.
    pub date: NaiveDate,
    /// First epoch second of the day (inclusive).
    pub start: i64,
    /// First epoch second of the next day (exclusive).
    pub end: i64,
}

impl DayWindow {
    /// Builds the window for `date`, rolling over at `day_ends_at` local
    /// time.
    pub fn new(date: NaiveDate, day_ends_at: u32) -> Self {
        let rollover = NaiveTime::from_hms_opt(day_ends_at, 0, 0).unwrap_or(NaiveTime::MIN);
        Self {
            date,
            start: local_to_epoch(date.and_time(rollover)),
            end: local_to_epoch((date + Duration::days(1)).and_time(rollover)),
        }
    }

    /// Inclusive bounds for storage queries.
    pub fn query_bounds(&self) -> (i64, i64) {
        (self.start, self.end - 1)
    }
}

/// Converts a local wall-clock time to an epoch second.
/// Handles DST ambiguity by picking the earlier time.
pub fn local_to_epoch(local: NaiveDateTime) -> i64 {
    match Local.from_local_datetime(&local) {
        // Single or ambiguous (DST fall-back): use the earlier time
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.timestamp(),
        LocalResult::None => {
            // DST spring-forward gap: the same wall time an hour later exists
            let shifted = local + Duration::hours(1);
            match Local.from_local_datetime(&shifted) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.timestamp(),
                LocalResult::None => shifted.and_utc().timestamp(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    // ========== Date parsing ==========

    #[test]
    fn parses_full_year() {
        assert_eq!(parse_date("2015-10-03").unwrap(), date(2015, 10, 3));
    }

    #[test]
    fn two_digit_year_means_20xx() {
        assert_eq!(parse_date("15-10-02").unwrap(), date(2015, 10, 2));
    }

    #[test]
    fn accepts_dot_and_slash_separators() {
        assert_eq!(parse_date("2018.01.30").unwrap(), date(2018, 1, 30));
        assert_eq!(parse_date("2018/01/30").unwrap(), date(2018, 1, 30));
    }

    #[test]
    fn rejects_unrecognized_input() {
        let error = parse_date("tomorrow").unwrap_err();
        assert!(error.to_string().contains("unrecognized date"));
    }

    #[test]
    fn rejects_impossible_calendar_date() {
        let error = parse_date("2018-13-40").unwrap_err();
        assert!(error.to_string().contains("not a valid calendar date"));
    }

    // ========== Date selection ==========

    #[test]
    fn explicit_date_wins_over_day_keyword() {
        let resolved = effective_date(
            Some(Day::Today),
            Some("2015-10-02"),
            Day::Yesterday,
            date(2018, 1, 31),
        )
        .unwrap();
        assert_eq!(resolved, date(2015, 10, 2));
    }

    #[test]
    fn day_keyword_overrides_default() {
        let resolved =
            effective_date(Some(Day::Today), None, Day::Yesterday, date(2018, 1, 31)).unwrap();
        assert_eq!(resolved, date(2018, 1, 31));
    }

    #[test]
    fn default_day_yesterday_steps_back_one_day() {
        let resolved = effective_date(None, None, Day::Yesterday, date(2018, 1, 31)).unwrap();
        assert_eq!(resolved, date(2018, 1, 30));
    }

    // ========== Day windows ==========

    #[test]
    fn window_spans_twenty_four_hours() {
        // Mid-January avoids DST transitions in practice.
        let window = DayWindow::new(date(2018, 1, 15), 3);
        assert_eq!(window.end - window.start, 24 * 3600);
    }

    #[test]
    fn later_rollover_shifts_the_window() {
        let at_three = DayWindow::new(date(2018, 1, 15), 3);
        let at_five = DayWindow::new(date(2018, 1, 15), 5);
        assert_eq!(at_five.start - at_three.start, 2 * 3600);
    }

    #[test]
    fn query_bounds_are_inclusive() {
        let window = DayWindow {
            date: date(2018, 1, 30),
            start: 1000,
            end: 87400,
        };
        assert_eq!(window.query_bounds(), (1000, 87399));
    }
}
