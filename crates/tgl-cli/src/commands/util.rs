//! Shared helpers for the day-oriented commands: loading a day of events,
//! classifying and compressing them, and formatting the summary.

use std::collections::BTreeMap;
use std::fmt::Write;

use anyhow::{Context, Result};
use tgl_core::{Event, Ruleset, SYSTEM_EVENT, compress};
use tgl_db::Database;

use crate::day::DayWindow;

/// Loads one day of raw events, classifies them against the ruleset, and
/// compresses them into submission candidates.
pub fn compressed_events(
    db: &Database,
    ruleset: &Ruleset,
    window: DayWindow,
    min_seconds: i64,
) -> Result<Vec<Event>> {
    let (start, end) = window.query_bounds();
    let records = db
        .events_between(start, end)
        .context("failed to load events")?;
    tracing::debug!(count = records.len(), date = %window.date, "loaded events");

    let mut events: Vec<Event> = records.into_iter().map(Event::from).collect();
    for event in &mut events {
        if event.title == SYSTEM_EVENT {
            continue;
        }
        if let Some(classification) = ruleset.classify(&event.process, &event.title) {
            event.apply_classification(classification);
        }
    }

    Ok(compress(events, min_seconds, SYSTEM_EVENT))
}

/// Groups compressed events by project name. Events without a project are
/// dropped; they were never classified and cannot be submitted.
pub fn group_by_project(events: Vec<Event>) -> BTreeMap<String, Vec<Event>> {
    let mut projects: BTreeMap<String, Vec<Event>> = BTreeMap::new();
    for event in events {
        let Some(project) = event.project.clone() else {
            continue;
        };
        projects.entry(project).or_default().push(event);
    }
    projects
}

/// Formats a duration in seconds as `Xh Ym Zs`.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{}h {}m {}s",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// One line per project. The duration covers only pending events; already
/// consumed ones are counted separately so reruns read sensibly.
pub fn format_summary(projects: &BTreeMap<String, Vec<Event>>) -> String {
    let mut output = String::new();
    for (name, events) in projects {
        let pending = events.iter().filter(|event| !event.consumed).count();
        let consumed = events.len() - pending;
        let duration: i64 = events
            .iter()
            .filter(|event| !event.consumed)
            .map(|event| event.duration)
            .sum();
        writeln!(
            output,
            "Project '{name}': [{}] {pending} events ({consumed} already consumed)",
            format_duration(duration),
        )
        .unwrap();
    }
    output
}
