//! Command-line pipeline for the focus-log submission tool.
//!
//! Wires configuration, storage, classification, and the Toggl client
//! into the `tgl` command set.

mod cli;
pub mod commands;
mod config;
pub mod day;
pub mod render;

pub use cli::{Cli, Commands};
pub use config::{Config, Day};
