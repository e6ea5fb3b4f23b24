use crate::error::{AppError, Result};
use crate::models::DateRange;
use crate::services::yahoo::{FetchFailure, YahooClient};
use crate::services::Storage;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

/// Rows stored for one fetched symbol
#[derive(Debug, Clone, Serialize)]
pub struct SymbolRows {
    pub symbol: String,
    pub rows: usize,
}

/// Outcome of one fetch-and-store run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub requested: usize,
    pub succeeded: Vec<SymbolRows>,
    pub failures: Vec<FetchFailure>,
    pub db_rows: usize,
    pub csv_files: usize,
    pub metric_rows: usize,
    pub duration_secs: f64,
}

impl SyncReport {
    pub fn total_rows(&self) -> usize {
        self.succeeded.iter().map(|s| s.rows).sum()
    }
}

/// Fetches symbols from the market-data API and stores them
pub struct DataSync<'a> {
    client: &'a YahooClient,
    storage: &'a Storage,
}

impl<'a> DataSync<'a> {
    pub fn new(client: &'a YahooClient, storage: &'a Storage) -> Self {
        Self { client, storage }
    }

    /// Fetch `symbols` over `range`, save every success and rebuild its
    /// derived metrics
    ///
    /// A symbol that fails to fetch is reported, not fatal. A failure to
    /// write to storage aborts the run.
    pub async fn run<F>(&self, symbols: &[String], range: &DateRange, on_progress: F) -> Result<SyncReport>
    where
        F: FnMut(usize, usize, &str),
    {
        if symbols.is_empty() {
            return Err(AppError::InvalidInput("No symbols to fetch".to_string()));
        }
        DateRange::new(range.start, range.end)?;

        let start_time = Instant::now();
        info!("Fetching {} symbols for {}", symbols.len(), range);

        let batch = self.client.fetch_many(symbols, range, on_progress).await;
        let mut report = SyncReport {
            requested: symbols.len(),
            failures: batch.failures,
            ..Default::default()
        };

        for (symbol, rows) in &batch.data {
            if rows.is_empty() {
                warn!("No rows returned for {}", symbol);
                continue;
            }
            let saved = self.storage.save(rows).await?;
            report.db_rows += saved.db_rows;
            report.csv_files += saved.csv_files;
            report.metric_rows += self.storage.recompute_metrics(symbol).await?;
            report.succeeded.push(SymbolRows {
                symbol: symbol.clone(),
                rows: rows.len(),
            });
        }

        report.duration_secs = start_time.elapsed().as_secs_f64();
        info!(
            "Sync finished in {:.1}s: {} ok, {} failed, {} rows",
            report.duration_secs,
            report.succeeded.len(),
            report.failures.len(),
            report.total_rows()
        );
        Ok(report)
    }
}
