use crate::db::connection::{db_error, Database};
use crate::scraper::orchestrator::RunStats;
use crate::scraper::ScraperError;
use rusqlite::params;

#[derive(Debug, Clone)]
pub struct ScrapeRun {
    pub id: i64,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub catalogs_processed: Option<i64>,
    pub catalogs_failed: Option<i64>,
    pub pages_visited: Option<i64>,
    pub new_listings: Option<i64>,
    pub skipped_duplicates: Option<i64>,
    pub rows_persisted: Option<i64>,
    pub success: bool,
    pub error_message: Option<String>,
}

pub fn start_scrape_run(db: &Database, now: i64) -> Result<i64, ScraperError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO scrape_runs (started_at, success) VALUES (?, 0)",
            params![now],
        )
        .map_err(db_error)?;
        Ok(conn.last_insert_rowid())
    })
}

pub fn end_scrape_run(
    db: &Database,
    run_id: i64,
    now: i64,
    stats: Option<&RunStats>,
    error: Option<String>,
) -> Result<(), ScraperError> {
    let count = |f: fn(&RunStats) -> usize| stats.map(|s| f(s) as i64);

    db.with_conn(|conn| {
        conn.execute(
            "UPDATE scrape_runs SET finished_at = ?, catalogs_processed = ?, catalogs_failed = ?, \
             pages_visited = ?, new_listings = ?, skipped_duplicates = ?, rows_persisted = ?, \
             success = ?, error_message = ? WHERE id = ?",
            params![
                now,
                count(|s| s.catalogs_processed),
                count(|s| s.catalogs_failed),
                count(|s| s.pages_visited),
                count(|s| s.new_listings),
                count(|s| s.skipped_duplicates),
                count(|s| s.rows_persisted),
                error.is_none(),
                error,
                run_id
            ],
        )
        .map_err(db_error)?;
        Ok(())
    })
}

pub fn get_recent_scrapes(db: &Database, limit: usize) -> Result<Vec<ScrapeRun>, ScraperError> {
    db.with_conn(|conn| {
        let mut stmt = conn
            .prepare(
                "SELECT id, started_at, finished_at, catalogs_processed, catalogs_failed, \
                 pages_visited, new_listings, skipped_duplicates, rows_persisted, success, \
                 error_message FROM scrape_runs ORDER BY started_at DESC, id DESC LIMIT ?",
            )
            .map_err(db_error)?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(ScrapeRun {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    catalogs_processed: row.get(3)?,
                    catalogs_failed: row.get(4)?,
                    pages_visited: row.get(5)?,
                    new_listings: row.get(6)?,
                    skipped_duplicates: row.get(7)?,
                    rows_persisted: row.get(8)?,
                    success: row.get(9)?,
                    error_message: row.get(10)?,
                })
            })
            .map_err(db_error)?;

        let mut runs = Vec::new();
        for r in rows {
            runs.push(r.map_err(db_error)?);
        }
        Ok(runs)
    })
}
