//! Folds a noisy focus log into a small set of billable intervals.
//!
//! # Algorithm Summary
//!
//! 1. Sort events by start time.
//! 2. Assign each event a naive duration: the gap to the next event's start.
//!    The final event's end is unknown, so it keeps whatever duration it
//!    already carried (zero for fresh records).
//! 3. Scan left to right. Events shorter than the minimum duration and
//!    system records contribute no time of their own. Every other classified
//!    event becomes an anchor and absorbs subsequent events while they are
//!    short, carry the same title, or have no project. A system record
//!    always stops the scan.
//! 4. Keep only events that end up with positive duration and a project.

use crate::event::Event;

/// Compresses `events` into surviving labelled intervals.
///
/// Absorbed events record their ids in the survivor's `merged` list and are
/// not returned. Events whose title equals `system_sentinel` are never
/// absorbed and never survive. An event with duration exactly
/// `min_duration_seconds` is not short; only strictly smaller durations are.
pub fn compress(
    mut events: Vec<Event>,
    min_duration_seconds: i64,
    system_sentinel: &str,
) -> Vec<Event> {
    let total = events.len();
    events.sort_by_key(|event| event.start);

    for n in 1..events.len() {
        let gap = events[n].start - events[n - 1].start;
        events[n - 1].duration = gap;
    }

    for n in 0..events.len() {
        if events[n].duration < min_duration_seconds || events[n].title == system_sentinel {
            events[n].duration = 0;
            continue;
        }
        if events[n].project.is_none() {
            // Unclassified events never absorb; the filter below drops them.
            continue;
        }

        let (head, tail) = events.split_at_mut(n + 1);
        let anchor = &mut head[n];
        for other in tail.iter_mut() {
            if other.title == system_sentinel {
                break;
            }
            if other.duration < min_duration_seconds
                || other.title == anchor.title
                || other.project.is_none()
            {
                anchor.absorb(other);
            } else {
                break;
            }
        }
    }

    events.retain(|event| {
        event.duration > 0
            && event
                .project
                .as_deref()
                .is_some_and(|project| !project.is_empty())
    });
    tracing::debug!(total, survivors = events.len(), "compressed events");
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{RawRecord, SYSTEM_EVENT};
    use crate::rules::{RuleDef, Ruleset};

    const MIN_SECONDS: i64 = 60;

    fn event(id: i64, process: &str, title: &str, start: i64) -> Event {
        Event::from(RawRecord {
            id,
            process: process.to_string(),
            title: title.to_string(),
            start,
            consumed: false,
        })
    }

    fn classified(id: i64, process: &str, title: &str, project: &str, start: i64) -> Event {
        let mut event = event(id, process, title, start);
        event.project = Some(project.to_string());
        event
    }

    fn ts(hours: i64, minutes: i64, seconds: i64) -> i64 {
        hours * 3600 + minutes * 60 + seconds
    }

    #[test]
    fn empty_input_compresses_to_nothing() {
        assert!(compress(Vec::new(), MIN_SECONDS, SYSTEM_EVENT).is_empty());
    }

    #[test]
    fn same_title_run_collapses_into_one_anchor() {
        // Three identical studio64 windows 20 minutes apart, then a switch
        // to the browser.
        let title = "App - [/path] - Main.java - Android Studio";
        let events = vec![
            classified(1, "studio64", title, "App", ts(10, 0, 0)),
            classified(2, "studio64", title, "App", ts(10, 20, 0)),
            classified(3, "studio64", title, "App", ts(10, 40, 0)),
            classified(4, "chrome", "reddit: the front page", "Casual", ts(11, 0, 0)),
            event(5, "System.Idle", SYSTEM_EVENT, ts(11, 2, 0)),
        ];

        let compressed = compress(events, MIN_SECONDS, SYSTEM_EVENT);

        assert_eq!(compressed.len(), 2);
        assert_eq!(compressed[0].id, 1);
        assert_eq!(compressed[0].duration, 3600);
        assert_eq!(compressed[0].merged, vec![2, 3]);
        assert_eq!(compressed[1].id, 4);
        assert_eq!(compressed[1].duration, 120);
    }

    #[test]
    fn short_interruption_is_absorbed_into_the_preceding_anchor() {
        // 30 seconds of browser in the middle of an editing session.
        let title = "App - Main.java";
        let events = vec![
            classified(1, "studio64", title, "App", ts(9, 0, 0)),
            classified(2, "chrome", "reddit", "Casual", ts(9, 10, 0)),
            classified(3, "studio64", title, "App", ts(9, 10, 30)),
            event(4, "System.Idle", SYSTEM_EVENT, ts(9, 20, 30)),
        ];

        let compressed = compress(events, MIN_SECONDS, SYSTEM_EVENT);

        assert_eq!(compressed.len(), 1);
        assert_eq!(compressed[0].id, 1);
        assert_eq!(compressed[0].duration, 600 + 30 + 600);
        assert_eq!(compressed[0].merged, vec![2, 3]);
    }

    #[test]
    fn system_record_splits_same_titled_anchors() {
        let title = "App - Main.java";
        let events = vec![
            classified(1, "studio64", title, "App", ts(13, 0, 0)),
            event(2, "System.SessionLock", SYSTEM_EVENT, ts(13, 30, 0)),
            classified(3, "studio64", title, "App", ts(13, 45, 0)),
            classified(4, "chrome", "news", "Casual", ts(14, 15, 0)),
            event(5, "System.Idle", SYSTEM_EVENT, ts(14, 20, 0)),
        ];

        let compressed = compress(events, MIN_SECONDS, SYSTEM_EVENT);

        // Two separate anchors; the lock record and the 15 minutes it covers
        // are dropped.
        assert_eq!(compressed.len(), 3);
        assert_eq!(compressed[0].id, 1);
        assert_eq!(compressed[0].duration, 1800);
        assert!(compressed[0].merged.is_empty());
        assert_eq!(compressed[1].id, 3);
        assert_eq!(compressed[1].duration, 1800);
        assert_eq!(compressed[2].id, 4);
        assert_eq!(compressed[2].duration, 300);
    }

    #[test]
    fn duration_equal_to_the_minimum_is_not_short() {
        let events = vec![
            classified(1, "studio64", "A - x", "A", ts(9, 0, 0)),
            classified(2, "chrome", "B", "B", ts(9, 2, 0)),
            classified(3, "sublime_text", "C - y", "C", ts(9, 3, 0)),
            event(4, "System.Idle", SYSTEM_EVENT, ts(9, 4, 0)),
        ];

        let compressed = compress(events, MIN_SECONDS, SYSTEM_EVENT);

        assert_eq!(compressed.len(), 3);
        assert!(compressed.iter().all(|event| event.merged.is_empty()));
    }

    #[test]
    fn duration_one_below_the_minimum_is_absorbed() {
        let events = vec![
            classified(1, "studio64", "A - x", "A", ts(9, 0, 0)),
            classified(2, "chrome", "B", "B", ts(9, 2, 0)),
            classified(3, "sublime_text", "C - y", "C", ts(9, 2, 59)),
            event(4, "System.Idle", SYSTEM_EVENT, ts(9, 4, 0)),
        ];

        let compressed = compress(events, MIN_SECONDS, SYSTEM_EVENT);

        assert_eq!(compressed.len(), 2);
        assert_eq!(compressed[0].id, 1);
        assert_eq!(compressed[0].duration, 120 + 59);
        assert_eq!(compressed[0].merged, vec![2]);
        assert_eq!(compressed[1].id, 3);
        assert_eq!(compressed[1].duration, 61);
    }

    #[test]
    fn unclassified_events_do_not_absorb() {
        // A long unclassified window neither survives nor extends itself, so
        // the short event after it is simply dropped.
        let events = vec![
            event(1, "mystery", "Unknown Window", ts(9, 0, 0)),
            classified(2, "chrome", "B", "B", ts(9, 30, 0)),
            classified(3, "studio64", "A - x", "A", ts(9, 30, 30)),
            event(4, "System.Idle", SYSTEM_EVENT, ts(9, 40, 0)),
        ];

        let compressed = compress(events, MIN_SECONDS, SYSTEM_EVENT);

        assert_eq!(compressed.len(), 1);
        assert_eq!(compressed[0].id, 3);
        assert_eq!(compressed[0].duration, 570);
        assert!(compressed[0].merged.is_empty());
    }

    #[test]
    fn anchors_absorb_following_unclassified_events() {
        let events = vec![
            classified(1, "studio64", "A - x", "A", ts(9, 0, 0)),
            event(2, "mystery", "Unknown Window", ts(9, 10, 0)),
            classified(3, "chrome", "B", "B", ts(9, 40, 0)),
            event(4, "System.Idle", SYSTEM_EVENT, ts(9, 45, 0)),
        ];

        let compressed = compress(events, MIN_SECONDS, SYSTEM_EVENT);

        assert_eq!(compressed.len(), 2);
        assert_eq!(compressed[0].id, 1);
        assert_eq!(compressed[0].duration, 600 + 1800);
        assert_eq!(compressed[0].merged, vec![2]);
        assert_eq!(compressed[1].id, 3);
        assert_eq!(compressed[1].duration, 300);
    }

    #[test]
    fn input_order_does_not_matter() {
        let title = "App - Main.java";
        let sorted = vec![
            classified(1, "studio64", title, "App", ts(9, 0, 0)),
            classified(2, "chrome", "B", "B", ts(9, 10, 0)),
            classified(3, "studio64", title, "App", ts(9, 10, 30)),
            event(4, "System.Idle", SYSTEM_EVENT, ts(9, 20, 30)),
        ];
        let mut shuffled = sorted.clone();
        shuffled.swap(0, 3);
        shuffled.swap(1, 2);

        assert_eq!(
            compress(sorted, MIN_SECONDS, SYSTEM_EVENT),
            compress(shuffled, MIN_SECONDS, SYSTEM_EVENT)
        );
    }

    #[test]
    fn compressing_survivors_again_changes_nothing() {
        let events = vec![
            classified(1, "studio64", "A - x", "A", ts(9, 0, 0)),
            classified(2, "chrome", "news", "Casual", ts(9, 2, 0)),
            classified(3, "sublime_text", "C - y", "C", ts(9, 10, 0)),
            event(4, "System.Idle", SYSTEM_EVENT, ts(9, 30, 0)),
        ];

        let first = compress(events, MIN_SECONDS, SYSTEM_EVENT);
        assert_eq!(first.len(), 3);

        // Survivors are distinct long classified events; recomputing the
        // pairwise gaps reproduces their durations, and the trailing event
        // keeps the duration it earned.
        let second = compress(first.clone(), MIN_SECONDS, SYSTEM_EVENT);
        assert_eq!(second, first);
    }

    // ========== Full-day regression ==========

    const GDBACKUP: &str = "/gdbackup/gdbackup.py (gdbackup) - Sublime Text";
    const AUTO_TOGGL: &str = "/auto-toggl/main.py (auto-toggl) - Sublime Text";
    const STARCRAFT: &str = "StarCraft on Reddit";

    fn studio(project: &str) -> String {
        format!("{project} - [/path/to/project] - FileName.java - Android Studio 3.0.1")
    }

    fn rules() -> Ruleset {
        let defs: Vec<RuleDef> = serde_json::from_str(
            r#"[
              {
                "process": "sublime_text",
                "project_pattern": ".*\\((.*?)\\) - Sublime Text.*",
                "description_pattern": ".*?([\\w\\d\\-]+\\.[\\w\\d\\-]+) .*?\\(.*?\\) - Sublime Text.*"
              },
              {
                "process": "studio64",
                "project_pattern": "(.*?) - \\[.*\\].*",
                "description_pattern": [".*? - \\[.*?\\] - (.*?) - .*"],
                "tags": ["android", "dev"]
              },
              {
                "process": "chrome",
                "tags": ["chrome"],
                "subprojects": [
                  {
                    "project": "Casual",
                    "description": "Internetting",
                    "tags": ["_"],
                    "window_contains": ["news", "politics", "reddit", "starcraft"]
                  }
                ]
              }
            ]"#,
        )
        .unwrap();
        Ruleset::compile(&defs).unwrap()
    }

    fn day() -> Vec<Event> {
        let entries: Vec<(&str, String, i64)> = vec![
            ("chrome", STARCRAFT.to_string(), ts(10, 22, 0)),
            ("studio64", studio("Commons"), ts(10, 23, 30)),
            ("sublime_text", GDBACKUP.to_string(), ts(10, 23, 50)),
            ("System.Idle", SYSTEM_EVENT.to_string(), ts(10, 24, 35)),
            ("studio64", studio("LEDControl"), ts(10, 25, 5)),
            ("chrome", STARCRAFT.to_string(), ts(11, 55, 5)),
            ("studio64", studio("CommonsManager"), ts(11, 55, 25)),
            ("chrome", STARCRAFT.to_string(), ts(11, 56, 10)),
            ("sublime_text", GDBACKUP.to_string(), ts(11, 56, 55)),
            ("sublime_text", GDBACKUP.to_string(), ts(11, 58, 25)),
            ("System.SessionLock", SYSTEM_EVENT.to_string(), ts(12, 28, 25)),
            ("System.SessionUnlock", SYSTEM_EVENT.to_string(), ts(12, 28, 55)),
            ("studio64", studio("Commons"), ts(12, 30, 55)),
            ("studio64", studio("Commons"), ts(14, 0, 55)),
            ("studio64", studio("LEDControl"), ts(14, 1, 0)),
            ("studio64", studio("LEDControl"), ts(14, 1, 5)),
            ("sublime_text", GDBACKUP.to_string(), ts(14, 3, 5)),
            ("System.UnIdle", SYSTEM_EVENT.to_string(), ts(14, 3, 10)),
            ("studio64", studio("CommonsManager"), ts(14, 3, 15)),
            ("sublime_text", AUTO_TOGGL.to_string(), ts(14, 3, 45)),
            ("sublime_text", GDBACKUP.to_string(), ts(14, 4, 30)),
            ("studio64", studio("LEDControl"), ts(14, 6, 0)),
            ("System.UnIdle", SYSTEM_EVENT.to_string(), ts(14, 6, 5)),
            ("chrome", "Politics".to_string(), ts(15, 36, 5)),
            ("studio64", studio("LEDControl"), ts(15, 38, 5)),
        ];

        entries
            .into_iter()
            .enumerate()
            .map(|(index, (process, title, start))| {
                event(i64::try_from(index).unwrap() + 1, process, &title, start)
            })
            .collect()
    }

    #[test]
    fn full_day_compresses_to_expected_intervals() {
        let rules = rules();
        let mut events = day();
        for event in &mut events {
            if event.title == SYSTEM_EVENT {
                continue;
            }
            if let Some(classification) = rules.classify(&event.process, &event.title) {
                event.apply_classification(classification);
            }
        }

        let compressed = compress(events, MIN_SECONDS, SYSTEM_EVENT);

        let expected: [(i64, &str, i64, i64); 7] = [
            // (id, project, start, duration)
            (1, "Casual", ts(10, 22, 0), 155),
            (5, "LEDControl", ts(10, 25, 5), 5510),
            (9, "gdbackup", ts(11, 56, 55), 1890),
            (13, "Commons", ts(12, 30, 55), 5410),
            (16, "LEDControl", ts(14, 1, 5), 125),
            (21, "gdbackup", ts(14, 4, 30), 95),
            (24, "Casual", ts(15, 36, 5), 120),
        ];

        assert_eq!(compressed.len(), expected.len());
        for (event, (id, project, start, duration)) in compressed.iter().zip(expected) {
            assert_eq!(event.id, id);
            assert_eq!(event.project.as_deref(), Some(project));
            assert_eq!(event.start, start);
            assert_eq!(event.duration, duration);
        }

        // Absorbed ids follow their surviving anchor for consumption marking.
        assert_eq!(compressed[0].merged, vec![2, 3]);
        assert_eq!(compressed[1].merged, vec![6, 7, 8]);
        assert_eq!(compressed[2].merged, vec![10]);
        assert_eq!(compressed[3].merged, vec![14, 15]);
        assert_eq!(compressed[4].merged, vec![17]);
        assert_eq!(compressed[5].merged, vec![22]);
        assert_eq!(compressed[6].merged, vec![25]);

        // Classification rode along through the merge.
        assert!(compressed[0].tags.contains("chrome"));
        assert!(compressed[0].tags.contains("reddit"));
        assert_eq!(compressed[2].description.as_deref(), Some("gdbackup.py"));
    }
}
