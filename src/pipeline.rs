use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::Source;
use crate::db::Store;
use crate::error::{RecordError, Result};
use crate::fetch::Fetcher;
use crate::parser;

/// Aggregate result of one scrape run.
#[derive(Debug, Serialize)]
pub struct ScrapeReport {
    pub inserted: usize,
    pub skipped: usize,
    pub errors: Vec<RecordError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScrapeReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Fetch the configured page and ingest it. A failed fetch returns before
/// anything is written.
pub async fn scrape(store: &Store, fetcher: &Fetcher, source: &Source) -> Result<ScrapeReport> {
    let started_at = Utc::now();
    let markup = fetcher.fetch(&source.url).await?;
    ingest_at(store, &markup, source, started_at)
}

/// Extract, normalize and persist records from already-fetched markup.
pub fn ingest(store: &Store, markup: &str, source: &Source) -> Result<ScrapeReport> {
    ingest_at(store, markup, source, Utc::now())
}

fn ingest_at(
    store: &Store,
    markup: &str,
    source: &Source,
    started_at: DateTime<Utc>,
) -> Result<ScrapeReport> {
    let (candidates, mut errors) =
        parser::process_markup(markup, &source.selectors, &source.base_origin);
    info!(
        "Extracted {} candidates ({} skipped as malformed)",
        candidates.len(),
        errors.len()
    );

    let outcome = store.upsert_records(&candidates)?;
    errors.extend(outcome.errors);

    let report = ScrapeReport {
        inserted: outcome.inserted,
        skipped: outcome.skipped,
        errors,
        started_at,
        finished_at: Utc::now(),
    };
    info!(
        "Scrape of {}: {} inserted, {} already present, {} errors",
        source.url,
        report.inserted,
        report.skipped,
        report.errors.len()
    );
    Ok(report)
}
