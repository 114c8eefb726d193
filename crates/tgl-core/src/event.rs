//! Event model shared by the storage, compression, and submission layers.

use std::collections::BTreeSet;

use crate::rules::Classification;

/// Reserved window title written by the focus logger when system status
/// changes (idle, lock, logoff). System records delimit billable time and
/// are never classified, absorbed, or submitted.
pub const SYSTEM_EVENT: &str = "__SYS__";

/// One focus-change observation as captured by the desktop logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Stable row id, used for consumption marking.
    pub id: i64,
    /// Name of the process that owned the focused window.
    pub process: String,
    /// Window title at capture time, or [`SYSTEM_EVENT`].
    pub title: String,
    /// Epoch seconds at which this window gained focus.
    pub start: i64,
    /// Whether this record was already submitted in a previous run.
    pub consumed: bool,
}

/// Working representation of a record while a day is being processed.
///
/// Created 1:1 from a [`RawRecord`], then mutated in place by classification
/// and by the compression pass. After compression only surviving events are
/// submitted; their `merged` lists carry the ids of everything absorbed
/// along the way so consumption marking reaches every underlying record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub process: String,
    pub title: String,
    pub start: i64,
    pub consumed: bool,
    /// Seconds this activity was continuously current. Zero until the
    /// compression pass assigns one.
    pub duration: i64,
    /// Resolved project title; `None` means unclassified.
    pub project: Option<String>,
    /// Resolved time entry description.
    pub description: Option<String>,
    /// Resolved tags, deduplicated, with deterministic iteration order.
    pub tags: BTreeSet<String>,
    /// Ids of records absorbed into this event.
    pub merged: Vec<i64>,
}

impl From<RawRecord> for Event {
    fn from(record: RawRecord) -> Self {
        Self {
            id: record.id,
            process: record.process,
            title: record.title,
            start: record.start,
            consumed: record.consumed,
            duration: 0,
            project: None,
            description: None,
            tags: BTreeSet::new(),
            merged: Vec::new(),
        }
    }
}

impl Event {
    /// Folds `other` into this event: its duration moves here, its own
    /// duration drops to zero, and its id joins `merged`.
    pub fn absorb(&mut self, other: &mut Event) {
        self.duration += other.duration;
        other.duration = 0;
        self.merged.push(other.id);
    }

    /// Copies a classification result onto this event.
    pub fn apply_classification(&mut self, classification: Classification) {
        self.project = Some(classification.project);
        self.description = classification.description;
        self.tags = classification.tags;
    }
}
