use crate::db::scrapes::ScrapeRun;
use crate::status::{Health, Phase, RunStatus};
use crate::templates::{card, desktop_layout, stat};
use chrono::{DateTime, Duration, TimeZone, Utc};
use maud::{html, Markup, PreEscaped};

pub struct DashboardVm {
    pub status: RunStatus,
    pub health: Health,
    pub uptime: Duration,
    pub recent: Vec<ScrapeRun>,
}

const CONTROL_SCRIPT: &str = "
async function scrape(action) {
  const resp = await fetch('/api/scrape/' + action, { method: 'POST' });
  const body = await resp.json();
  alert(body.message || body.status);
  location.reload();
}
";

pub fn dashboard_page(vm: &DashboardVm) -> Markup {
    let status = &vm.status;

    desktop_layout(
        "Imot Scraper",
        html! {
            main {
                h1 { "Scraper status" }
                p {
                    "Phase: "
                    strong class=(format!("phase-{}", phase_label(status.phase))) { (phase_label(status.phase)) }
                    @if status.stop_requested { " (stopping)" }
                }
                p { "Health: " (if vm.health.healthy { "healthy" } else { "unhealthy" }) " · " (vm.health.message) }

                (card("Totals", html! {
                    div class="stats" {
                        (stat("Uptime", format_duration(vm.uptime)))
                        (stat("Ads processed", status.total_ads_processed))
                        (stat("Errors", status.total_errors))
                        (stat("Last start", format_time(status.last_scrape_start)))
                        (stat("Last end", format_time(status.last_scrape_end)))
                        (stat("Last success", format_time(status.last_success)))
                    }
                }))

                @if let Some(run) = &status.last_run {
                    (card("Last run", html! {
                        div class="stats" {
                            (stat("Catalogs", run.catalogs_processed))
                            (stat("Catalogs failed", run.catalogs_failed))
                            (stat("Pages", run.pages_visited))
                            (stat("New listings", run.new_listings))
                            (stat("Duplicates skipped", run.skipped_duplicates))
                            (stat("Extraction failures", run.extraction_failures))
                            (stat("Screenshot failures", run.screenshot_failures))
                            (stat("Rows written", run.rows_persisted))
                            (stat("Rows unflushed", run.rows_unflushed))
                        }
                    }))
                }

                @if let Some(err) = &status.last_error {
                    (card("Last error", html! { p { code { (err) } } }))
                }

                (card("Controls", html! {
                    @if status.is_running {
                        button type="button" onclick="scrape('stop')" { "Stop scrape" }
                    } @else {
                        button type="button" onclick="scrape('start')" { "Start scrape" }
                    }
                    script { (PreEscaped(CONTROL_SCRIPT)) }
                }))

                (card("Recent runs", history_table(&vm.recent)))
            }
        },
    )
}

fn history_table(runs: &[ScrapeRun]) -> Markup {
    html! {
        @if runs.is_empty() {
            p { "No runs recorded yet." }
        } @else {
            table {
                thead {
                    tr {
                        th { "Started" }
                        th { "Finished" }
                        th { "Pages" }
                        th { "New" }
                        th { "Skipped" }
                        th { "Written" }
                        th { "Result" }
                    }
                }
                tbody {
                    @for run in runs {
                        tr {
                            td { (format_unix(Some(run.started_at))) }
                            td { (format_unix(run.finished_at)) }
                            td { (count(run.pages_visited)) }
                            td { (count(run.new_listings)) }
                            td { (count(run.skipped_duplicates)) }
                            td { (count(run.rows_persisted)) }
                            td {
                                @if run.finished_at.is_none() {
                                    "running"
                                } @else if run.success {
                                    "ok"
                                } @else {
                                    (run.error_message.as_deref().unwrap_or("failed"))
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Starting => "starting",
        Phase::Scraping => "scraping",
        Phase::Idle => "idle",
        Phase::Error => "error",
    }
}

fn count(n: Option<i64>) -> String {
    n.map(|n| n.to_string()).unwrap_or_else(|| "-".into())
}

fn format_time(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "never".into())
}

fn format_unix(ts: Option<i64>) -> String {
    format_time(ts.and_then(|ts| Utc.timestamp_opt(ts, 0).single()))
}

fn format_duration(d: Duration) -> String {
    let mins = d.num_minutes().max(0);
    format!("{}h {:02}m", mins / 60, mins % 60)
}
