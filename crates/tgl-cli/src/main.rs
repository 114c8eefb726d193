use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tgl_cli::commands::{cleanup, reset, show, submit};
use tgl_cli::day::{self, DayWindow};
use tgl_cli::{Cli, Commands, Config};

/// Loads and validates the configuration, then opens the database, creating
/// its parent directory if necessary.
fn open_database(
    config_path: Option<&Path>,
) -> Result<(tgl_db::Database, Config, tgl_core::Ruleset)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let ruleset = config.validate().context("invalid configuration")?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    let db = tgl_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config, ruleset))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Submit {
            day,
            date,
            local,
            render,
            workspace,
            min_seconds,
            day_ends_at,
        }) => {
            let (mut db, mut config, ruleset) = open_database(cli.config.as_deref())?;
            if let Some(workspace) = workspace {
                config.workspace.clone_from(workspace);
            }
            if let Some(seconds) = min_seconds {
                config.minimum_event_seconds = *seconds;
            }
            if let Some(hour) = day_ends_at {
                config.day_ends_at = *hour;
            }

            let date = day::effective_date(
                *day,
                date.as_deref(),
                config.default_day,
                Local::now().date_naive(),
            )?;
            let window = DayWindow::new(date, config.day_ends_at);
            submit::run(
                &mut db,
                &config,
                &ruleset,
                window,
                submit::Options {
                    local: *local,
                    render: *render,
                },
            )?;
        }
        Some(Commands::Show { day, date }) => {
            let (db, config, ruleset) = open_database(cli.config.as_deref())?;
            let date = day::effective_date(
                *day,
                date.as_deref(),
                config.default_day,
                Local::now().date_naive(),
            )?;
            let window = DayWindow::new(date, config.day_ends_at);
            show::run(&db, &config, &ruleset, window)?;
        }
        Some(Commands::Reset { day, date }) => {
            let (mut db, config, _ruleset) = open_database(cli.config.as_deref())?;
            let date = day::effective_date(
                *day,
                date.as_deref(),
                config.default_day,
                Local::now().date_naive(),
            )?;
            let window = DayWindow::new(date, config.day_ends_at);
            reset::run(&mut db, window)?;
        }
        Some(Commands::Cleanup {
            older_than,
            before,
            all,
        }) => {
            let (mut db, _config, _ruleset) = open_database(cli.config.as_deref())?;
            cleanup::run(
                &mut db,
                &cleanup::Options {
                    older_than: *older_than,
                    before: before.clone(),
                    all: *all,
                },
            )?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
