use crate::error::{AppError, Result};
use crate::models::{DateRange, DerivedMetric, StockPrice};
use crate::utils::format_date;
use chrono::NaiveDate;
use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// SQLite store for daily prices and derived metrics
#[derive(Debug)]
pub struct PriceDatabase {
    pool: SqlitePool,
    database_path: PathBuf,
}

/// Database schema version for migrations
const DB_SCHEMA_VERSION: &str = "1";

impl PriceDatabase {
    /// Open (creating if needed) the database at `database_path`
    pub async fn new(database_path: PathBuf) -> Result<Self> {
        info!("Initializing SQLite database at: {:?}", database_path);

        if let Some(parent) = database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(&database_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePool::connect_with(connect_options).await?;

        let db = Self { pool, database_path };
        db.initialize_database().await?;

        info!("SQLite database initialized successfully");
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.database_path
    }

    /// Create tables and indexes if they don't exist
    async fn initialize_database(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stock_data (
                id TEXT PRIMARY KEY,
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS derived_metrics (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                indicator TEXT NOT NULL,
                value REAL NOT NULL,
                PRIMARY KEY (symbol, date, indicator)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        let indexes = [
            "CREATE INDEX IF NOT EXISTS idx_stock_data_symbol_date ON stock_data(symbol, date)",
            "CREATE INDEX IF NOT EXISTS idx_stock_data_date ON stock_data(date)",
            "CREATE INDEX IF NOT EXISTS idx_derived_metrics_date ON derived_metrics(date)",
        ];
        for index in indexes {
            sqlx::query(index).execute(&self.pool).await?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)")
            .bind(DB_SCHEMA_VERSION)
            .execute(&self.pool)
            .await?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Insert or update price rows keyed by `{symbol}_{date}`
    pub async fn upsert_prices(&self, rows: &[StockPrice]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut transaction = self.pool.begin().await?;
        let mut affected_rows = 0;

        for row in rows {
            let result = sqlx::query(
                r#"
                INSERT INTO stock_data (id, symbol, date, open, high, low, close, volume)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(id) DO UPDATE SET
                    open = excluded.open,
                    high = excluded.high,
                    low = excluded.low,
                    close = excluded.close,
                    volume = excluded.volume
                "#,
            )
            .bind(row.key())
            .bind(&row.symbol)
            .bind(format_date(row.date))
            .bind(row.open)
            .bind(row.high)
            .bind(row.low)
            .bind(row.close)
            .bind(row.volume as i64)
            .execute(&mut *transaction)
            .await?;

            affected_rows += result.rows_affected() as usize;
        }

        transaction.commit().await?;
        debug!("Upserted {} price rows", affected_rows);
        Ok(affected_rows)
    }

    /// All rows for one date, sorted by symbol
    pub async fn load_day(&self, date: NaiveDate) -> Result<Vec<StockPrice>> {
        let rows = sqlx::query(
            "SELECT symbol, date, open, high, low, close, volume FROM stock_data WHERE date = ?1 ORDER BY symbol",
        )
        .bind(format_date(date))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_price).collect()
    }

    /// Rows for one symbol in `range`, ordered by date
    pub async fn load_range(&self, symbol: &str, range: &DateRange) -> Result<Vec<StockPrice>> {
        let rows = sqlx::query(
            r#"
            SELECT symbol, date, open, high, low, close, volume
            FROM stock_data
            WHERE symbol = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date
            "#,
        )
        .bind(symbol)
        .bind(format_date(range.start))
        .bind(format_date(range.end))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_price).collect()
    }

    /// Every stored row of one symbol, ordered by date
    pub async fn load_symbol(&self, symbol: &str) -> Result<Vec<StockPrice>> {
        let rows = sqlx::query(
            "SELECT symbol, date, open, high, low, close, volume FROM stock_data WHERE symbol = ?1 ORDER BY date",
        )
        .bind(symbol)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_price).collect()
    }

    /// Distinct dates, ascending
    pub async fn available_dates(&self) -> Result<Vec<NaiveDate>> {
        let dates: Vec<String> = sqlx::query_scalar("SELECT DISTINCT date FROM stock_data ORDER BY date")
            .fetch_all(&self.pool)
            .await?;
        dates.iter().map(|d| parse_db_date(d)).collect()
    }

    /// Distinct symbols on `date`, or overall when `None`
    pub async fn available_symbols(&self, date: Option<NaiveDate>) -> Result<Vec<String>> {
        let symbols: Vec<String> = match date {
            Some(date) => {
                sqlx::query_scalar("SELECT DISTINCT symbol FROM stock_data WHERE date = ?1 ORDER BY symbol")
                    .bind(format_date(date))
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT DISTINCT symbol FROM stock_data ORDER BY symbol")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(symbols)
    }

    /// Delete all prices and metrics on `date`, returning price rows removed
    pub async fn clear_date(&self, date: NaiveDate) -> Result<u64> {
        let date_str = format_date(date);
        let mut transaction = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM stock_data WHERE date = ?1")
            .bind(&date_str)
            .execute(&mut *transaction)
            .await?;
        sqlx::query("DELETE FROM derived_metrics WHERE date = ?1")
            .bind(&date_str)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;
        info!("Cleared {} records for {} from database", result.rows_affected(), date_str);
        Ok(result.rows_affected())
    }

    /// Get count of price records
    pub async fn record_count(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM stock_data")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Replace every metric of `symbol` with `metrics`
    pub async fn replace_metrics(&self, symbol: &str, metrics: &[DerivedMetric]) -> Result<usize> {
        let mut transaction = self.pool.begin().await?;

        sqlx::query("DELETE FROM derived_metrics WHERE symbol = ?1")
            .bind(symbol)
            .execute(&mut *transaction)
            .await?;

        for metric in metrics {
            sqlx::query(
                "INSERT OR REPLACE INTO derived_metrics (symbol, date, indicator, value) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&metric.symbol)
            .bind(format_date(metric.date))
            .bind(&metric.indicator)
            .bind(metric.value)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;
        Ok(metrics.len())
    }

    /// Metrics of `symbol` in `range`, optionally filtered by indicator name
    pub async fn load_metrics(
        &self,
        symbol: &str,
        indicator: Option<&str>,
        range: &DateRange,
    ) -> Result<Vec<DerivedMetric>> {
        let rows = sqlx::query(
            r#"
            SELECT symbol, date, indicator, value
            FROM derived_metrics
            WHERE symbol = ?1 AND date >= ?2 AND date <= ?3
              AND (?4 IS NULL OR indicator = ?4)
            ORDER BY date, indicator
            "#,
        )
        .bind(symbol)
        .bind(format_date(range.start))
        .bind(format_date(range.end))
        .bind(indicator)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let date: String = row.try_get("date")?;
                Ok(DerivedMetric {
                    symbol: row.try_get("symbol")?,
                    date: parse_db_date(&date)?,
                    indicator: row.try_get("indicator")?,
                    value: row.try_get("value")?,
                })
            })
            .collect()
    }

    pub async fn stats(&self) -> Result<DatabaseStats> {
        let total_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_data")
            .fetch_one(&self.pool)
            .await?;
        let unique_symbols: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT symbol) FROM stock_data")
            .fetch_one(&self.pool)
            .await?;
        let metric_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM derived_metrics")
            .fetch_one(&self.pool)
            .await?;

        let row = sqlx::query("SELECT MIN(date) AS first_date, MAX(date) AS last_date FROM stock_data")
            .fetch_one(&self.pool)
            .await?;
        let first: Option<String> = row.try_get("first_date")?;
        let last: Option<String> = row.try_get("last_date")?;

        Ok(DatabaseStats {
            total_records,
            unique_symbols,
            metric_rows,
            first_date: first.as_deref().map(parse_db_date).transpose()?,
            last_date: last.as_deref().map(parse_db_date).transpose()?,
        })
    }

    /// Close the database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
        info!("SQLite database connection pool closed");
    }
}

fn parse_db_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| AppError::Database(format!("Corrupt date '{}' in database: {}", value, e)))
}

/// Convert SQL row to StockPrice
fn row_to_price(row: sqlx::sqlite::SqliteRow) -> Result<StockPrice> {
    let date: String = row.try_get("date")?;
    Ok(StockPrice {
        symbol: row.try_get("symbol")?,
        date: parse_db_date(&date)?,
        open: row.try_get("open")?,
        high: row.try_get("high")?,
        low: row.try_get("low")?,
        close: row.try_get("close")?,
        volume: row.try_get::<i64, _>("volume")?.max(0) as u64,
    })
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseStats {
    pub total_records: i64,
    pub unique_symbols: i64,
    pub metric_rows: i64,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}
