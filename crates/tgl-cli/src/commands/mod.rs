//! CLI subcommand implementations.

pub mod cleanup;
pub mod reset;
pub mod show;
pub mod submit;
pub mod util;
