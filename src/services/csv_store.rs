//! CSV storage, one directory per trading date
//!
//! ```text
//! data/
//!   2024-01-01/
//!     RELIANCE_NS.csv
//!     TCS_NS.csv
//! ```
//!
//! Each file holds the header from [`CSV_HEADER`] and one row per
//! `(symbol, date)`, so writing a file is an upsert of that key.

use crate::constants::{csv_column, CSV_HEADER, DATE_FORMAT};
use crate::error::{AppError, Result};
use crate::models::{DateRange, StockPrice};
use crate::utils::{file_symbol, format_date, symbol_from_file_stem};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Writer};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Summary of what is on disk
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CsvStats {
    pub date_count: usize,
    pub file_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn day_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join(format_date(date))
    }

    fn file_path(&self, symbol: &str, date: NaiveDate) -> PathBuf {
        self.day_dir(date).join(format!("{}.csv", file_symbol(symbol)))
    }

    /// Write rows grouped by `(date, symbol)`, replacing existing files
    ///
    /// Returns the number of files written.
    pub fn save(&self, rows: &[StockPrice]) -> Result<usize> {
        let mut grouped: BTreeMap<(NaiveDate, &str), Vec<&StockPrice>> = BTreeMap::new();
        for row in rows {
            grouped.entry((row.date, row.symbol.as_str())).or_default().push(row);
        }

        for ((date, symbol), group) in &grouped {
            let dir = self.day_dir(*date);
            fs::create_dir_all(&dir)?;
            let path = self.file_path(symbol, *date);

            let mut writer = Writer::from_path(&path)?;
            writer.write_record(CSV_HEADER)?;
            // one row per key; the last duplicate wins
            if let Some(row) = group.last() {
                writer.write_record(&[
                    row.symbol.clone(),
                    format_date(row.date),
                    row.open.to_string(),
                    row.high.to_string(),
                    row.low.to_string(),
                    row.close.to_string(),
                    row.volume.to_string(),
                ])?;
            }
            writer.flush()?;
            debug!("Wrote {}", path.display());
        }

        Ok(grouped.len())
    }

    /// All rows for one date, sorted by symbol
    pub fn load_day(&self, date: NaiveDate) -> Result<Vec<StockPrice>> {
        let dir = self.day_dir(date);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut rows = Vec::new();
        for path in csv_files(&dir)? {
            match read_csv_file(&path) {
                Ok(mut file_rows) => rows.append(&mut file_rows),
                Err(e) => warn!("Skipping unreadable file {}: {}", path.display(), e),
            }
        }
        rows.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(rows)
    }

    /// Rows for one symbol within `range`, sorted by date
    pub fn load_range(&self, symbol: &str, range: &DateRange) -> Result<Vec<StockPrice>> {
        let mut rows = Vec::new();
        for date in self.available_dates()?.into_iter().filter(|d| range.contains(*d)) {
            let path = self.file_path(symbol, date);
            if !path.is_file() {
                continue;
            }
            let file_rows = match read_csv_file(&path) {
                Ok(file_rows) => file_rows,
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", path.display(), e);
                    continue;
                }
            };
            rows.extend(
                file_rows
                    .into_iter()
                    .filter(|r| r.symbol == symbol && range.contains(r.date)),
            );
        }
        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }

    /// Dates that have a directory, ascending
    ///
    /// Directory names that are not dates are ignored.
    pub fn available_dates(&self) -> Result<Vec<NaiveDate>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut dates = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            if let Ok(date) = NaiveDate::parse_from_str(&name.to_string_lossy(), DATE_FORMAT) {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }

    /// Symbols present on `date`, or on any date when `None`
    pub fn available_symbols(&self, date: Option<NaiveDate>) -> Result<Vec<String>> {
        let dates = match date {
            Some(d) => vec![d],
            None => self.available_dates()?,
        };

        let mut symbols = Vec::new();
        for date in dates {
            let dir = self.day_dir(date);
            if !dir.is_dir() {
                continue;
            }
            for path in csv_files(&dir)? {
                match read_csv_file(&path) {
                    Ok(rows) if !rows.is_empty() => symbols.extend(rows.into_iter().map(|r| r.symbol)),
                    _ => {
                        if let Some(stem) = path.file_stem() {
                            symbols.push(symbol_from_file_stem(&stem.to_string_lossy()));
                        }
                    }
                }
            }
        }
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }

    /// Delete a date directory, returning the number of files removed
    pub fn clear_date(&self, date: NaiveDate) -> Result<usize> {
        let dir = self.day_dir(date);
        if !dir.is_dir() {
            return Ok(0);
        }
        let count = csv_files(&dir)?.len();
        fs::remove_dir_all(&dir)?;
        info!("Removed {} CSV files for {}", count, format_date(date));
        Ok(count)
    }

    pub fn stats(&self) -> Result<CsvStats> {
        let dates = self.available_dates()?;
        let mut file_count = 0;
        for date in &dates {
            file_count += csv_files(&self.day_dir(*date))?.len();
        }
        Ok(CsvStats {
            date_count: dates.len(),
            file_count,
            first_date: dates.first().copied(),
            last_date: dates.last().copied(),
        })
    }
}

fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read every row of one CSV file
pub fn read_csv_file(path: &Path) -> Result<Vec<StockPrice>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        let get = |idx: usize| record.get(idx).unwrap_or("").trim();
        let parse_f64 = |idx: usize, name: &str| -> Result<f64> {
            get(idx).parse::<f64>().map_err(|_| {
                AppError::Parse(format!(
                    "{}: row {} has invalid {} '{}'",
                    path.display(),
                    line + 2,
                    name,
                    get(idx)
                ))
            })
        };

        let date = NaiveDate::parse_from_str(get(csv_column::DATE), DATE_FORMAT).map_err(|_| {
            AppError::Parse(format!("{}: row {} has invalid date", path.display(), line + 2))
        })?;
        // volume may have been written as a float by other tools
        let volume = get(csv_column::VOLUME)
            .parse::<u64>()
            .or_else(|_| get(csv_column::VOLUME).parse::<f64>().map(|v| v.max(0.0) as u64))
            .map_err(|_| {
                AppError::Parse(format!(
                    "{}: row {} has invalid volume '{}'",
                    path.display(),
                    line + 2,
                    get(csv_column::VOLUME)
                ))
            })?;

        rows.push(StockPrice {
            symbol: get(csv_column::SYMBOL).to_string(),
            date,
            open: parse_f64(csv_column::OPEN, "open")?,
            high: parse_f64(csv_column::HIGH, "high")?,
            low: parse_f64(csv_column::LOW, "low")?,
            close: parse_f64(csv_column::CLOSE, "close")?,
            volume,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn row(symbol: &str, date: &str, close: f64) -> StockPrice {
        StockPrice::new(symbol, d(date), close - 1.0, close + 2.0, close - 3.0, close, 1_000)
    }

    #[test]
    fn test_round_trip_unchanged() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path());
        let rows = vec![
            StockPrice::new("RELIANCE.NS", d("2024-01-02"), 2580.15, 2601.9, 2571.05, 2595.3, 4_512_233),
            StockPrice::new("TCS.NS", d("2024-01-02"), 3790.0, 3812.45, 3777.1, 3801.123456789, 1_234_567),
        ];

        assert_eq!(store.save(&rows).unwrap(), 2);
        let loaded = store.load_day(d("2024-01-02")).unwrap();
        assert_eq!(loaded, rows);
        assert!(dir.path().join("2024-01-02").join("RELIANCE_NS.csv").is_file());
    }

    #[test]
    fn test_save_overwrites_same_key() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path());
        store.save(&[row("INFY.NS", "2024-01-02", 100.0)]).unwrap();
        store.save(&[row("INFY.NS", "2024-01-02", 105.0)]).unwrap();

        let loaded = store.load_day(d("2024-01-02")).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].close, 105.0);
    }

    #[test]
    fn test_load_range_returns_exactly_in_range_rows() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path());
        let rows: Vec<StockPrice> = (1..=9)
            .map(|day| row("TCS.NS", &format!("2024-01-0{}", day), 100.0 + day as f64))
            .chain(std::iter::once(row("INFY.NS", "2024-01-05", 50.0)))
            .collect();
        store.save(&rows).unwrap();

        let range = DateRange::parse("2024-01-03", "2024-01-06").unwrap();
        let loaded = store.load_range("TCS.NS", &range).unwrap();
        let dates: Vec<String> = loaded.iter().map(|r| format_date(r.date)).collect();
        assert_eq!(dates, vec!["2024-01-03", "2024-01-04", "2024-01-05", "2024-01-06"]);
        assert!(loaded.iter().all(|r| r.symbol == "TCS.NS"));
    }

    #[test]
    fn test_load_range_skips_unreadable_file() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path());
        let rows: Vec<StockPrice> = (1..=3)
            .map(|day| row("TCS.NS", &format!("2024-01-0{}", day), 100.0))
            .collect();
        store.save(&rows).unwrap();
        fs::write(
            store.file_path("TCS.NS", d("2024-01-02")),
            "symbol,date,open,high,low,close,volume\nTCS.NS,2024-01-02,abc,1,1,1,100\n",
        )
        .unwrap();

        let range = DateRange::parse("2024-01-01", "2024-01-03").unwrap();
        let loaded = store.load_range("TCS.NS", &range).unwrap();
        let dates: Vec<String> = loaded.iter().map(|r| format_date(r.date)).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-03"]);
    }

    #[test]
    fn test_invalid_volume_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("TCS_NS.csv");
        fs::write(
            &path,
            "symbol,date,open,high,low,close,volume\nTCS.NS,2024-01-02,1,2,0.5,1.5,n/a\n",
        )
        .unwrap();
        assert!(matches!(read_csv_file(&path), Err(AppError::Parse(_))));

        fs::write(
            &path,
            "symbol,date,open,high,low,close,volume\nTCS.NS,2024-01-02,1,2,0.5,1.5,1234.0\n",
        )
        .unwrap();
        assert_eq!(read_csv_file(&path).unwrap()[0].volume, 1234);
    }

    #[test]
    fn test_available_dates_ignores_non_date_dirs() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path());
        store.save(&[row("A.NS", "2024-02-02", 1.0), row("A.NS", "2024-01-31", 1.0)]).unwrap();
        fs::create_dir_all(dir.path().join("backup")).unwrap();

        assert_eq!(store.available_dates().unwrap(), vec![d("2024-01-31"), d("2024-02-02")]);
    }

    #[test]
    fn test_available_symbols() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path());
        store
            .save(&[
                row("TCS.NS", "2024-01-01", 1.0),
                row("M&M.NS", "2024-01-01", 1.0),
                row("INFY.NS", "2024-01-02", 1.0),
            ])
            .unwrap();

        assert_eq!(
            store.available_symbols(Some(d("2024-01-01"))).unwrap(),
            vec!["M&M.NS", "TCS.NS"]
        );
        assert_eq!(store.available_symbols(None).unwrap().len(), 3);
    }

    #[test]
    fn test_clear_date() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path());
        store.save(&[row("A.NS", "2024-01-01", 1.0), row("B.NS", "2024-01-01", 1.0)]).unwrap();

        assert_eq!(store.clear_date(d("2024-01-01")).unwrap(), 2);
        assert!(store.load_day(d("2024-01-01")).unwrap().is_empty());
        assert_eq!(store.clear_date(d("2024-01-01")).unwrap(), 0);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempdir().unwrap();
        let store = CsvStore::new(dir.path().join("nothing"));
        assert!(store.available_dates().unwrap().is_empty());
        assert_eq!(store.stats().unwrap().file_count, 0);
    }
}
