use crate::scraper::ScraperError;
use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::info;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

// Thread-local connections, one per database path.
thread_local! {
    static DB_CONNS: RefCell<HashMap<String, Connection>> = RefCell::new(HashMap::new());
}

pub(crate) fn db_error(e: impl std::fmt::Display) -> ScraperError {
    ScraperError::Persistence(e.to_string())
}

#[derive(Clone, Debug)]
pub struct Database {
    path: String,
}

impl Database {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Provides a mutable connection to the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ScraperError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ScraperError>,
    {
        DB_CONNS
            .try_with(|cell| {
                let mut conns = cell.borrow_mut();
                if !conns.contains_key(&self.path) {
                    let conn = Connection::open(&self.path)
                        .map_err(|e| db_error(format!("Open DB failed: {e}")))?;
                    conns.insert(self.path.clone(), conn);
                }
                match conns.get_mut(&self.path) {
                    Some(conn) => f(conn),
                    None => Err(db_error("connection slot vanished")),
                }
            })
            .map_err(|_| db_error("thread-local connection unavailable"))?
    }
}

/// Create the tables if they do not exist yet.
pub fn init_db(db: &Database) -> Result<(), ScraperError> {
    db.with_conn(|conn| {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| db_error(format!("Failed to apply schema: {e}")))
    })?;

    info!(path = db.path(), "database initialized");
    Ok(())
}
