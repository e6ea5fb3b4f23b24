//! Storage facade over the SQLite database and the CSV tree
//!
//! Writes go to both backends. Reads try the database first and fall back
//! to CSV when the database is disabled, fails, or has nothing for the
//! request.

use crate::error::{AppError, Result};
use crate::models::{DateRange, DerivedMetric, SeriesBySymbol, StockPrice};
use crate::services::analysis::derive_metrics;
use crate::services::csv_store::CsvStore;
use crate::services::database::PriceDatabase;
use crate::utils::{format_date, get_data_dir, get_database_path};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub type SharedStorage = Arc<Storage>;

/// Rows and files written by one save
#[derive(Debug, Clone, Default, Serialize)]
pub struct SaveSummary {
    pub db_rows: usize,
    pub csv_files: usize,
}

/// Rows and files removed for one date
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClearSummary {
    pub date: String,
    pub db_rows: u64,
    pub csv_files: usize,
}

/// CSV → database migration statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub dates: usize,
    pub records: usize,
    pub errors: Vec<String>,
    pub duration_secs: u64,
}

#[derive(Debug)]
pub struct Storage {
    database: Option<PriceDatabase>,
    csv: CsvStore,
}

impl Storage {
    /// Open both backends; a database that fails to open leaves CSV-only mode
    pub async fn open(csv_root: PathBuf, database_path: Option<PathBuf>) -> Self {
        let csv = CsvStore::new(csv_root);
        let database = match database_path {
            Some(path) => match PriceDatabase::new(path.clone()).await {
                Ok(db) => Some(db),
                Err(e) => {
                    warn!("Database at {} unavailable, using CSV only: {}", path.display(), e);
                    None
                }
            },
            None => {
                info!("Database disabled, using CSV only");
                None
            }
        };
        Self { database, csv }
    }

    /// Open using `DATA_DIR` and `DATABASE_URL`
    pub async fn from_env() -> Self {
        Self::open(get_data_dir(), get_database_path()).await
    }

    pub fn csv_only(csv_root: PathBuf) -> Self {
        Self {
            database: None,
            csv: CsvStore::new(csv_root),
        }
    }

    pub fn database(&self) -> Option<&PriceDatabase> {
        self.database.as_ref()
    }

    pub fn csv(&self) -> &CsvStore {
        &self.csv
    }

    /// Human readable backend description
    pub fn backend(&self) -> &'static str {
        if self.database.is_some() {
            "sqlite+csv"
        } else {
            "csv"
        }
    }

    /// Persist rows to the database (when present) and CSV
    pub async fn save(&self, rows: &[StockPrice]) -> Result<SaveSummary> {
        let mut summary = SaveSummary::default();
        if rows.is_empty() {
            return Ok(summary);
        }

        if let Some(db) = &self.database {
            summary.db_rows = db.upsert_prices(rows).await?;
        }
        summary.csv_files = self.csv.save(rows)?;

        debug!(
            "Saved {} rows ({} db rows, {} csv files)",
            rows.len(),
            summary.db_rows,
            summary.csv_files
        );
        Ok(summary)
    }

    /// All symbols on one date, sorted by symbol
    pub async fn load_day(&self, date: NaiveDate) -> Result<Vec<StockPrice>> {
        if let Some(db) = &self.database {
            match db.load_day(date).await {
                Ok(rows) if !rows.is_empty() => return Ok(rows),
                Ok(_) => debug!("No database rows for {}, trying CSV", format_date(date)),
                Err(e) => warn!("Database read failed, falling back to CSV: {}", e),
            }
        }
        self.csv.load_day(date)
    }

    /// One symbol over `range`, sorted by date
    pub async fn load_range(&self, symbol: &str, range: &DateRange) -> Result<Vec<StockPrice>> {
        if let Some(db) = &self.database {
            match db.load_range(symbol, range).await {
                Ok(rows) if !rows.is_empty() => return Ok(rows),
                Ok(_) => debug!("No database rows for {} ({}), trying CSV", symbol, range),
                Err(e) => warn!("Database read failed, falling back to CSV: {}", e),
            }
        }
        self.csv.load_range(symbol, range)
    }

    /// Several symbols over `range`; symbols without rows are omitted
    pub async fn load_many(&self, symbols: &[String], range: &DateRange) -> Result<SeriesBySymbol> {
        let mut out = SeriesBySymbol::new();
        for symbol in symbols {
            let rows = self.load_range(symbol, range).await?;
            if !rows.is_empty() {
                out.insert(symbol.clone(), rows);
            }
        }
        Ok(out)
    }

    /// Every available symbol over `range`
    pub async fn load_all(&self, range: &DateRange) -> Result<SeriesBySymbol> {
        let symbols = self.available_symbols(None).await?;
        self.load_many(&symbols, range).await
    }

    /// Dates with data, ascending
    pub async fn available_dates(&self) -> Result<Vec<NaiveDate>> {
        if let Some(db) = &self.database {
            match db.available_dates().await {
                Ok(dates) if !dates.is_empty() => return Ok(dates),
                Ok(_) => {}
                Err(e) => warn!("Database read failed, falling back to CSV: {}", e),
            }
        }
        self.csv.available_dates()
    }

    /// Symbols on `date`, or overall when `None`
    pub async fn available_symbols(&self, date: Option<NaiveDate>) -> Result<Vec<String>> {
        if let Some(db) = &self.database {
            match db.available_symbols(date).await {
                Ok(symbols) if !symbols.is_empty() => return Ok(symbols),
                Ok(_) => {}
                Err(e) => warn!("Database read failed, falling back to CSV: {}", e),
            }
        }
        self.csv.available_symbols(date)
    }

    pub async fn latest_date(&self) -> Result<Option<NaiveDate>> {
        Ok(self.available_dates().await?.last().copied())
    }

    /// Latest available date strictly before `date`
    pub async fn previous_date(&self, date: NaiveDate) -> Result<Option<NaiveDate>> {
        let dates = self.available_dates().await?;
        Ok(crate::utils::previous_trading_day(&dates, date))
    }

    /// Remove one date from both backends
    pub async fn clear_date(&self, date: NaiveDate) -> Result<ClearSummary> {
        let db_rows = match &self.database {
            Some(db) => db.clear_date(date).await?,
            None => 0,
        };
        let csv_files = self.csv.clear_date(date)?;
        Ok(ClearSummary {
            date: format_date(date),
            db_rows,
            csv_files,
        })
    }

    /// Copy every CSV date into the database
    ///
    /// `on_progress(done, total)` runs after each date.
    pub async fn migrate_csv_to_db<F>(&self, mut on_progress: F) -> Result<MigrationReport>
    where
        F: FnMut(usize, usize),
    {
        let db = self
            .database
            .as_ref()
            .ok_or_else(|| AppError::Config("No database configured (DATABASE_URL=none)".to_string()))?;

        let start_time = Instant::now();
        let dates = self.csv.available_dates()?;
        let mut report = MigrationReport::default();

        if dates.is_empty() {
            info!("No CSV data to migrate");
            return Ok(report);
        }

        info!("Starting migration of {} dates from CSV to database", dates.len());
        let total = dates.len();
        for (i, date) in dates.into_iter().enumerate() {
            let result = match self.csv.load_day(date) {
                Ok(rows) if rows.is_empty() => {
                    warn!("No data found for {} in CSV", format_date(date));
                    Ok(0)
                }
                Ok(rows) => db.upsert_prices(&rows).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(count) => {
                    report.records += count;
                    report.dates += 1;
                }
                Err(e) => {
                    let msg = format!("{}: {}", format_date(date), e);
                    warn!("Migration error {}", msg);
                    report.errors.push(msg);
                }
            }
            on_progress(i + 1, total);
        }

        report.duration_secs = start_time.elapsed().as_secs();
        info!(
            "Migration completed: {} dates, {} records, {} errors",
            report.dates,
            report.records,
            report.errors.len()
        );
        Ok(report)
    }

    /// Migrate only when the database is empty and CSV data exists
    pub async fn auto_migrate(&self) -> Result<Option<MigrationReport>> {
        let Some(db) = &self.database else {
            return Ok(None);
        };
        if db.record_count().await? > 0 || self.csv.available_dates()?.is_empty() {
            return Ok(None);
        }
        info!("Database is empty, importing existing CSV data");
        self.migrate_csv_to_db(|_, _| {}).await.map(Some)
    }

    /// Rebuild derived metrics for `symbol` from its full stored series
    ///
    /// Returns the number of metric rows written (0 in CSV-only mode).
    pub async fn recompute_metrics(&self, symbol: &str) -> Result<usize> {
        let Some(db) = &self.database else {
            return Ok(0);
        };
        let series = db.load_symbol(symbol).await?;
        let metrics = derive_metrics(&series);
        let written = db.replace_metrics(symbol, &metrics).await?;
        debug!("Recomputed {} metrics for {}", written, symbol);
        Ok(written)
    }

    pub async fn load_metrics(
        &self,
        symbol: &str,
        indicator: Option<&str>,
        range: &DateRange,
    ) -> Result<Vec<DerivedMetric>> {
        match &self.database {
            Some(db) => db.load_metrics(symbol, indicator, range).await,
            None => Err(AppError::Config(
                "Derived metrics require a database (DATABASE_URL)".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn series(symbol: &str, days: i64) -> Vec<StockPrice> {
        (0..days)
            .map(|i| {
                let close = 100.0 + i as f64;
                StockPrice::new(symbol, d("2024-01-01") + chrono::Duration::days(i), close, close + 1.0, close - 1.0, close, 1000 + i as u64)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_save_writes_both_backends() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path().join("csv"), Some(dir.path().join("db.sqlite"))).await;
        assert_eq!(storage.backend(), "sqlite+csv");

        let summary = storage.save(&series("TCS.NS", 3)).await.unwrap();
        assert_eq!(summary.db_rows, 3);
        assert_eq!(summary.csv_files, 3);
        assert_eq!(storage.csv().available_dates().unwrap().len(), 3);
        assert_eq!(storage.database().unwrap().record_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_falls_back_to_csv_when_db_empty() {
        let dir = tempdir().unwrap();
        let csv_root = dir.path().join("csv");
        CsvStore::new(&csv_root).save(&series("INFY.NS", 5)).unwrap();

        let storage = Storage::open(csv_root, Some(dir.path().join("db.sqlite"))).await;
        let range = DateRange::parse("2024-01-02", "2024-01-04").unwrap();
        assert_eq!(storage.load_range("INFY.NS", &range).await.unwrap().len(), 3);
        assert_eq!(storage.available_dates().await.unwrap().len(), 5);
        assert_eq!(storage.available_symbols(None).await.unwrap(), vec!["INFY.NS"]);
    }

    #[tokio::test]
    async fn test_auto_migrate_only_when_db_empty() {
        let dir = tempdir().unwrap();
        let csv_root = dir.path().join("csv");
        CsvStore::new(&csv_root).save(&series("INFY.NS", 4)).unwrap();

        let storage = Storage::open(csv_root, Some(dir.path().join("db.sqlite"))).await;
        let report = storage.auto_migrate().await.unwrap().unwrap();
        assert_eq!(report.dates, 4);
        assert_eq!(report.records, 4);
        assert!(report.errors.is_empty());

        assert!(storage.auto_migrate().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_migrate_requires_database() {
        let dir = tempdir().unwrap();
        let storage = Storage::csv_only(dir.path().to_path_buf());
        assert!(matches!(storage.migrate_csv_to_db(|_, _| {}).await, Err(AppError::Config(_))));
        assert_eq!(storage.recompute_metrics("X").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_date_and_previous_date() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path().join("csv"), Some(dir.path().join("db.sqlite"))).await;
        storage.save(&series("TCS.NS", 3)).await.unwrap();

        assert_eq!(storage.previous_date(d("2024-01-03")).await.unwrap(), Some(d("2024-01-02")));
        let cleared = storage.clear_date(d("2024-01-02")).await.unwrap();
        assert_eq!(cleared.db_rows, 1);
        assert_eq!(cleared.csv_files, 1);
        assert_eq!(storage.previous_date(d("2024-01-03")).await.unwrap(), Some(d("2024-01-01")));
        assert_eq!(storage.latest_date().await.unwrap(), Some(d("2024-01-03")));
    }

    #[tokio::test]
    async fn test_recompute_metrics() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path().join("csv"), Some(dir.path().join("db.sqlite"))).await;
        storage.save(&series("TCS.NS", 25)).await.unwrap();

        let written = storage.recompute_metrics("TCS.NS").await.unwrap();
        assert!(written > 0);

        let range = DateRange::parse("2024-01-01", "2024-12-31").unwrap();
        let ma20 = storage.load_metrics("TCS.NS", Some("ma_20"), &range).await.unwrap();
        // 25 rows give 6 full 20-day windows
        assert_eq!(ma20.len(), 6);
        // closes 100..=119 average to 109.5
        assert!((ma20[0].value - 109.5).abs() < 1e-9);
    }
}
