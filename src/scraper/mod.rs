pub mod batch;
pub mod catalog;
pub mod dedup;
pub mod extractor;
pub mod fetcher;
pub mod models;
pub mod orchestrator;
pub mod pacer;
pub mod retry;
mod scraper_error;
pub mod text;

pub use orchestrator::{Orchestrator, RunStats};
pub use scraper_error::ScraperError;
