use crate::config::{AppConfig, Cli, Command};
use crate::db::connection::Database;
use crate::router::{respond, AppState};
use crate::status::StatusHandle;
use crate::tests::utils::init_test_db;
use astra::Body;
use chrono::{Duration, Utc};
use clap::Parser;
use http::{Method, Request};
use std::io::Read;

fn test_config(db: &Database) -> AppConfig {
    let cli = Cli::try_parse_from(["imot_scraper", "run", "--database-path", db.path()]).unwrap();
    let Command::Run(config) = cli.command else {
        panic!("expected run");
    };
    config
}

fn state_with(db: Database, status: StatusHandle) -> AppState {
    AppState {
        config: test_config(&db),
        status,
        db,
    }
}

fn call(state: &AppState, method: Method, uri: &str) -> (u16, String) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let resp = respond(req, state);
    let code = resp.status().as_u16();

    let mut body = String::new();
    resp.into_body().reader().read_to_string(&mut body).unwrap();
    (code, body)
}

#[test]
fn fresh_service_is_healthy() {
    let (_dir, db) = init_test_db();
    let state = state_with(db, StatusHandle::new(Utc::now()));

    let (code, body) = call(&state, Method::GET, "/health");
    assert_eq!(code, 200);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json["uptime_seconds"].is_number());
}

#[test]
fn no_success_after_grace_period_is_unhealthy() {
    let (_dir, db) = init_test_db();
    let state = state_with(db, StatusHandle::new(Utc::now() - Duration::hours(3)));

    let (code, body) = call(&state, Method::GET, "/health");
    assert_eq!(code, 503);
    assert!(body.contains("unhealthy"), "{body}");
}

#[test]
fn status_reports_counters_and_uptime() {
    let (_dir, db) = init_test_db();
    let state = state_with(db, StatusHandle::new(Utc::now() - Duration::minutes(5)));

    let (code, body) = call(&state, Method::GET, "/api/status");
    assert_eq!(code, 200);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["phase"], "starting");
    assert_eq!(json["is_running"], false);
    assert_eq!(json["total_ads_processed"], 0);
    assert!(json["uptime_seconds"].as_i64().unwrap() >= 300);
    assert!(json["timestamp"].is_string());
}

#[test]
fn second_start_is_rejected_while_running() {
    let (_dir, db) = init_test_db();
    let status = StatusHandle::new(Utc::now());
    assert!(status.try_begin(Utc::now()));
    let state = state_with(db, status);

    let (code, body) = call(&state, Method::POST, "/api/scrape/start");
    assert_eq!(code, 400);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "error");
    assert!(json["message"].as_str().unwrap().contains("already"));
}

#[test]
fn stop_when_idle_and_while_running() {
    let (_dir, db) = init_test_db();
    let status = StatusHandle::new(Utc::now());
    let state = state_with(db, status.clone());

    let (code, body) = call(&state, Method::POST, "/api/scrape/stop");
    assert_eq!(code, 200);
    assert!(body.contains("idle"), "{body}");

    assert!(status.try_begin(Utc::now()));
    let (_, body) = call(&state, Method::POST, "/api/scrape/stop");
    assert!(body.contains("stopping"), "{body}");
    assert!(status.stop_requested());
}

#[test]
fn dashboard_renders() {
    let (_dir, db) = init_test_db();
    let state = state_with(db, StatusHandle::new(Utc::now()));

    let (code, body) = call(&state, Method::GET, "/");
    assert_eq!(code, 200);
    assert!(body.contains("Scraper status"));
    assert!(body.contains("No runs recorded yet."));
}

#[test]
fn unknown_routes_are_404() {
    let (_dir, db) = init_test_db();
    let state = state_with(db, StatusHandle::new(Utc::now()));

    assert_eq!(call(&state, Method::GET, "/nope").0, 404);
    assert_eq!(call(&state, Method::GET, "/api/scrape/start").0, 404);
}
