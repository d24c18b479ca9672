use crate::config::AppConfig;
use crate::cycle::spawn_cycle;
use crate::db::connection::Database;
use crate::db::scrapes::get_recent_scrapes;
use crate::errors::ServerError;
use crate::responses::{error_response, html_response, json_response, json_status_response, ResultResp};
use crate::status::StatusHandle;
use crate::templates::pages::{dashboard_page, DashboardVm};
use astra::{Request, Response};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};

const RECENT_RUNS: usize = 10;

/// Everything a request handler can reach.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub status: StatusHandle,
    pub db: Database,
}

/// Route `req` and turn any error into a response.
pub fn respond(req: Request, state: &AppState) -> Response {
    let api = req.uri().path().starts_with("/api/");
    handle(req, state).unwrap_or_else(|err| error_response(err, api))
}

pub fn handle(req: Request, state: &AppState) -> ResultResp {
    let method = req.method().as_str();
    let path = req.uri().path();

    match (method, path) {
        ("GET", "/") => dashboard(state),
        ("GET", "/health") => health(state),
        ("GET", "/api/status") => status(state),
        ("POST", "/api/scrape/start") => start_scrape(state),
        ("POST", "/api/scrape/stop") => stop_scrape(state),
        _ => Err(ServerError::NotFound),
    }
}

fn dashboard(state: &AppState) -> ResultResp {
    let now = Utc::now();
    let recent = get_recent_scrapes(&state.db, RECENT_RUNS).unwrap_or_else(|e| {
        warn!(error = %e, "run history unavailable");
        Vec::new()
    });

    html_response(dashboard_page(&DashboardVm {
        status: state.status.snapshot(),
        health: state.status.health(now),
        uptime: state.status.uptime(now),
        recent,
    }))
}

fn health(state: &AppState) -> ResultResp {
    let now = Utc::now();
    let health = state.status.health(now);
    let code = if health.healthy { 200 } else { 503 };

    json_status_response(
        code,
        &json!({
            "status": if health.healthy { "healthy" } else { "unhealthy" },
            "message": health.message,
            "uptime_seconds": state.status.uptime(now).num_seconds(),
        }),
    )
}

fn status(state: &AppState) -> ResultResp {
    let now = Utc::now();
    let mut body =
        serde_json::to_value(state.status.snapshot()).map_err(|_| ServerError::InternalError)?;
    body["uptime_seconds"] = json!(state.status.uptime(now).num_seconds());
    body["timestamp"] = json!(now.to_rfc3339());
    json_response(&body)
}

fn start_scrape(state: &AppState) -> ResultResp {
    match spawn_cycle(state.config.clone(), state.status.clone()) {
        None => Err(ServerError::BadRequest("Scraping already in progress".into())),
        Some(Err(e)) => {
            error!(error = %e, "could not start scrape thread");
            Err(ServerError::InternalError)
        }
        Some(Ok(_)) => {
            info!("manual scrape started");
            json_response(&json!({ "status": "started", "message": "Scraping started" }))
        }
    }
}

fn stop_scrape(state: &AppState) -> ResultResp {
    if state.status.request_stop() {
        info!("stop requested over HTTP");
        json_response(&json!({ "status": "stopping", "message": "Stop requested" }))
    } else {
        json_response(&json!({ "status": "idle", "message": "No scrape is running" }))
    }
}
