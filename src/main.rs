use crate::config::{AppConfig, Cli, Command};
use crate::cycle::run_cycle;
use crate::db::connection::{init_db, Database};
use crate::router::{respond, AppState};
use crate::scheduler::{Schedule, Scheduler};
use crate::scraper::ScraperError;
use crate::status::StatusHandle;
use astra::Server;
use chrono::Utc;
use clap::Parser;
use std::net::SocketAddr;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod cycle;
mod db;
mod errors;
mod google;
mod responses;
mod router;
mod scheduler;
mod scraper;
mod screenshots;
mod spreadsheets;
mod status;
mod store;
mod templates;

#[cfg(test)]
mod tests;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("imot_scraper=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run(config) => run_once(&config),
        Command::Serve {
            config,
            port,
            schedule_hours,
            no_schedule,
        } => serve(config, port, schedule_hours, no_schedule),
        Command::Export {
            database_path,
            output,
        } => spreadsheets::export_store(Database::new(database_path), &output).map(|rows| {
            info!(rows, path = %output.display(), "export complete");
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "exiting with error");
            ExitCode::FAILURE
        }
    }
}

fn run_once(config: &AppConfig) -> Result<(), ScraperError> {
    config.validate()?;
    let status = StatusHandle::new(Utc::now());

    match run_cycle(config, &status) {
        Some(Ok(stats)) => {
            info!(?stats, "run complete");
            Ok(())
        }
        Some(Err(e)) => Err(e),
        None => Err(ScraperError::Config("a cycle is already running".into())),
    }
}

fn serve(
    config: AppConfig,
    port: u16,
    schedule_hours: u64,
    no_schedule: bool,
) -> Result<(), ScraperError> {
    config.validate()?;

    let db = Database::new(config.database_path.clone());
    if let Err(e) = init_db(&db) {
        warn!(error = %e, "run history database unavailable");
    }

    let status = StatusHandle::new(Utc::now());
    let state = AppState {
        config: config.clone(),
        status: status.clone(),
        db,
    };

    let _scheduler = if no_schedule {
        None
    } else {
        let schedule = Schedule::every_hours(schedule_hours);
        Some(Scheduler::start(schedule, move || {
            match run_cycle(&config, &status) {
                None => info!("previous cycle still running, skipping scheduled run"),
                Some(Ok(_)) => info!("scheduled cycle finished"),
                Some(Err(e)) => error!(error = %e, "scheduled cycle failed"),
            }
        })?)
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "status server listening");

    Server::bind(&addr)
        .max_workers(8)
        .serve(move |req, _info| respond(req, &state))?;

    info!("server shut down");
    Ok(())
}
