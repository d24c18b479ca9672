use crate::db::connection::Database;
use crate::db::listings::SqliteStore;
use crate::scraper::ScraperError;
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;
use tracing::info;

fn xlsx_error(what: &str, e: impl std::fmt::Display) -> ScraperError {
    ScraperError::Export(format!("{what}: {e}"))
}

/// Plain digits (optionally one decimal point) without a leading zero.
/// Phone numbers like `0888123456` stay text.
fn as_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    let digits_only = !cell.is_empty()
        && cell.chars().all(|c| c.is_ascii_digit() || c == '.')
        && cell.chars().filter(|&c| c == '.').count() <= 1
        && cell.chars().next().is_some_and(|c| c.is_ascii_digit());
    let leading_zero = cell.len() > 1 && cell.starts_with('0') && !cell.starts_with("0.");

    if !digits_only || leading_zero {
        return None;
    }
    cell.parse().ok()
}

/// Write `rows` (header first) to a single worksheet at `path`. Returns data rows written.
pub fn export_rows_xlsx(rows: &[Vec<String>], path: &Path) -> Result<usize, ScraperError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name("Обяви")
        .map_err(|e| xlsx_error("sheet name", e))?;

    let bold = Format::new().set_bold();

    for (r, row) in rows.iter().enumerate() {
        let xr = r as u32;
        for (c, cell) in row.iter().enumerate() {
            let xc = c as u16;

            if r == 0 {
                worksheet
                    .write_string_with_format(xr, xc, cell, &bold)
                    .map_err(|e| xlsx_error("header", e))?;
            } else if cell.starts_with('=') {
                worksheet
                    .write_formula(xr, xc, cell.as_str())
                    .map_err(|e| xlsx_error("formula", e))?;
            } else if let Some(n) = as_number(cell) {
                worksheet
                    .write_number(xr, xc, n)
                    .map_err(|e| xlsx_error("number", e))?;
            } else {
                worksheet
                    .write_string(xr, xc, cell)
                    .map_err(|e| xlsx_error("text", e))?;
            }
        }
    }

    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| xlsx_error("freeze header", e))?;

    workbook
        .save(path)
        .map_err(|e| xlsx_error("save workbook", e))?;

    Ok(rows.len().saturating_sub(1))
}

/// Export every row of the SQLite store at `db` to `path`.
pub fn export_store(db: Database, path: &Path) -> Result<usize, ScraperError> {
    let store = SqliteStore::open(db)?;
    let rows = store.all_rows()?;
    let written = export_rows_xlsx(&rows, path)?;
    info!(rows = written, path = %path.display(), "export written");
    Ok(written)
}
