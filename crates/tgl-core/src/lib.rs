//! Core engine for turning a raw window focus log into billable time entries.
//!
//! This crate owns the pure domain logic:
//!
//! - [`event`]: the record and event model shared by storage, compression,
//!   and submission
//! - [`rules`]: per-process classification rules compiled from configuration
//! - [`compress`]: the merge pass that folds a noisy focus log into a small
//!   number of labelled intervals
//!
//! Everything here is synchronous and IO-free; persistence lives in `tgl-db`
//! and the Toggl client in `tgl-api`.

pub mod compress;
pub mod event;
pub mod rules;

pub use compress::compress;
pub use event::{Event, RawRecord, SYSTEM_EVENT};
pub use rules::{Classification, RuleBody, RuleDef, RuleError, Ruleset};
