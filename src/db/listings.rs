use crate::db::connection::{db_error, init_db, Database};
use crate::scraper::models::COLUMN_HEADERS;
use crate::scraper::ScraperError;
use crate::store::ListingStore;
use rusqlite::params_from_iter;
use rusqlite::types::Value;

/// Table columns in store order (A..R).
const COLUMNS: [&str; 18] = [
    "property_type",
    "neighborhood",
    "price",
    "area",
    "price_per_area",
    "floor",
    "listing_date",
    "construction_type",
    "construction_year",
    "features",
    "seller",
    "seller_phone",
    "description",
    "condition",
    "screenshot",
    "deal_price",
    "comments",
    "source_url",
];

/// `ListingStore` over the local `listing_rows` table.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Wrap `db`, creating the schema and the header row when missing.
    pub fn open(db: Database) -> Result<Self, ScraperError> {
        init_db(&db)?;
        let store = Self { db };
        if store.row_count()? == 0 {
            let header: Vec<String> = COLUMN_HEADERS.iter().map(|h| h.to_string()).collect();
            store.append_rows(&[header])?;
        }
        Ok(store)
    }

    /// Every row, header first.
    pub fn all_rows(&self) -> Result<Vec<Vec<String>>, ScraperError> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM listing_rows ORDER BY row_number",
                COLUMNS.join(", ")
            );
            let mut stmt = conn.prepare(&sql).map_err(db_error)?;
            let rows = stmt
                .query_map([], |row| {
                    (0..COLUMNS.len())
                        .map(|i| row.get::<_, String>(i))
                        .collect::<Result<Vec<_>, _>>()
                })
                .map_err(db_error)?;

            let mut out = Vec::new();
            for r in rows {
                out.push(r.map_err(db_error)?);
            }
            Ok(out)
        })
    }
}

impl ListingStore for SqliteStore {
    fn column_values(&self, col: usize) -> Result<Vec<String>, ScraperError> {
        let column = col
            .checked_sub(1)
            .and_then(|i| COLUMNS.get(i))
            .ok_or_else(|| db_error(format!("no column {col}")))?;

        self.db.with_conn(|conn| {
            let sql = format!("SELECT {column} FROM listing_rows ORDER BY row_number");
            let mut stmt = conn.prepare(&sql).map_err(db_error)?;
            let values = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(db_error)?;

            let mut out = Vec::new();
            for v in values {
                out.push(v.map_err(db_error)?);
            }
            Ok(out)
        })
    }

    fn row_count(&self) -> Result<usize, ScraperError> {
        self.db.with_conn(|conn| {
            let n: i64 = conn
                .query_row("SELECT COALESCE(MAX(row_number), 0) FROM listing_rows", [], |r| r.get(0))
                .map_err(db_error)?;
            Ok(n as usize)
        })
    }

    fn append_rows(&self, rows: &[Vec<String>]) -> Result<(), ScraperError> {
        self.db.with_conn(|conn| {
            let tx = conn.transaction().map_err(db_error)?;

            let last: i64 = tx
                .query_row("SELECT COALESCE(MAX(row_number), 0) FROM listing_rows", [], |r| r.get(0))
                .map_err(db_error)?;

            let placeholders = vec!["?"; COLUMNS.len() + 1].join(", ");
            let sql = format!(
                "INSERT INTO listing_rows (row_number, {}) VALUES ({placeholders})",
                COLUMNS.join(", ")
            );

            {
                let mut stmt = tx.prepare(&sql).map_err(db_error)?;
                for (i, row) in rows.iter().enumerate() {
                    if row.len() != COLUMNS.len() {
                        return Err(db_error(format!(
                            "row has {} cells, expected {}",
                            row.len(),
                            COLUMNS.len()
                        )));
                    }
                    let values = std::iter::once(Value::Integer(last + i as i64 + 1))
                        .chain(row.iter().map(|cell| Value::Text(cell.clone())));
                    stmt.execute(params_from_iter(values)).map_err(db_error)?;
                }
            }

            tx.commit().map_err(db_error)?;
            Ok(())
        })
    }
}
