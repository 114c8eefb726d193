//! Submit command: classify and compress one day of events, print the
//! per-project summary, and push the pending ones to Toggl.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use chrono::Local;
use tgl_api::{ApiError, ProjectRef, TimeTracker, TogglClient};
use tgl_core::{Event, Ruleset};
use tgl_db::Database;

use crate::config::{self, Config};
use crate::day::DayWindow;
use crate::render;

use super::util;

/// Flags controlling a submit run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Dry run: everything except submission and consumption marking.
    pub local: bool,
    /// Write the HTML timeline preview to the data directory.
    pub render: bool,
}

/// What a submission pass accomplished.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Events the service accepted, flagged consumed.
    pub succeeded: Vec<Event>,
    /// Entries the service rejected; their events stay pending.
    pub failed: usize,
}

pub fn run(
    db: &mut Database,
    config: &Config,
    ruleset: &Ruleset,
    window: DayWindow,
    options: Options,
) -> Result<()> {
    let events = util::compressed_events(db, ruleset, window, config.minimum_event_seconds)?;
    if events.is_empty() {
        println!("No events!");
        return Ok(());
    }

    if options.render {
        let html = render::render_preview(&events, &Local);
        let path = config::dirs_data_path()
            .context("could not determine the data directory")?
            .join("preview.html");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("failed to create preview directory")?;
        }
        std::fs::write(&path, html).context("failed to write preview")?;
        println!("Preview written to {}", path.display());
    }

    let mut projects = util::group_by_project(events);
    print!("{}", util::format_summary(&projects));

    for events in projects.values_mut() {
        events.retain(|event| !event.consumed);
    }
    let pending: usize = projects.values().map(Vec::len).sum();
    if pending == 0 {
        return Ok(());
    }
    if options.local {
        tracing::info!(pending, "dry run, skipping submission");
        return Ok(());
    }

    anyhow::ensure!(!config.api_token.is_empty(), "api_token is not configured");
    let mut client = TogglClient::new(config.api_token.clone(), config.workspace.clone())
        .context("failed to create API client")?;
    let outcome = submit_events(&mut client, projects).context("failed to submit time entries")?;

    let consumed = db
        .consume(&outcome.succeeded)
        .context("failed to mark records consumed")?;
    tracing::debug!(consumed, "marked records consumed");
    if outcome.failed > 0 {
        tracing::warn!("{} events failed to be submitted", outcome.failed);
    }
    Ok(())
}

/// Pushes grouped events to the tracker, creating missing projects on the
/// fly.
///
/// A project that cannot be created takes its events out of this run; an
/// entry the service rejects is counted and skipped. Either way the affected
/// events stay pending for the next run. Only a failed project listing
/// aborts, since nothing can be submitted without it.
fn submit_events<T: TimeTracker>(
    tracker: &mut T,
    projects: BTreeMap<String, Vec<Event>>,
) -> Result<Outcome, ApiError> {
    let known = tracker.projects()?;

    let mut outcome = Outcome::default();
    for (name, events) in projects {
        let Some(project) = lookup_or_create(tracker, &known, &name) else {
            continue;
        };

        for mut event in events {
            if event.consumed {
                continue;
            }
            match tracker.create_time_entry(project.id, &event) {
                Ok(()) => {
                    event.consumed = true;
                    outcome.succeeded.push(event);
                }
                Err(error) => {
                    tracing::warn!(id = event.id, %error, "failed to submit time entry");
                    outcome.failed += 1;
                }
            }
        }
    }
    Ok(outcome)
}

fn lookup_or_create<T: TimeTracker>(
    tracker: &mut T,
    known: &HashMap<String, ProjectRef>,
    name: &str,
) -> Option<ProjectRef> {
    if let Some(project) = known.get(name) {
        return Some(*project);
    }
    match tracker.create_project(name) {
        Ok(project) => Some(project),
        Err(error) => {
            tracing::warn!(project = name, %error, "failed to create project, skipping its events");
            None
        }
    }
}
