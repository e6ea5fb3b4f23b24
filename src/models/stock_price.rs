use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar for one symbol, keyed by `(symbol, date)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPrice {
    /// Exchange symbol, e.g. `RELIANCE.NS`
    pub symbol: String,

    /// Trading date (exchange-local)
    pub date: NaiveDate,

    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,

    /// Shares traded
    pub volume: u64,
}

impl StockPrice {
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Primary key as stored in the database: `{symbol}_{YYYY-MM-DD}`
    pub fn key(&self) -> String {
        format!("{}_{}", self.symbol, self.date.format("%Y-%m-%d"))
    }
}

/// Sort rows chronologically and keep the last row seen for each date
pub fn sort_and_dedup_by_date(rows: &mut Vec<StockPrice>) {
    rows.sort_by_key(|r| r.date);
    let mut deduped: Vec<StockPrice> = Vec::with_capacity(rows.len());
    for row in rows.drain(..) {
        match deduped.last_mut() {
            Some(last) if last.date == row.date && last.symbol == row.symbol => *last = row,
            _ => deduped.push(row),
        }
    }
    *rows = deduped;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_key_format() {
        let row = StockPrice::new("TCS.NS", day(5), 1.0, 2.0, 0.5, 1.5, 10);
        assert_eq!(row.key(), "TCS.NS_2024-03-05");
    }

    #[test]
    fn test_sort_and_dedup_keeps_last() {
        let mut rows = vec![
            StockPrice::new("A", day(3), 1.0, 1.0, 1.0, 1.0, 1),
            StockPrice::new("A", day(1), 1.0, 1.0, 1.0, 1.0, 1),
            StockPrice::new("A", day(3), 2.0, 2.0, 2.0, 2.0, 2),
        ];
        sort_and_dedup_by_date(&mut rows);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, day(1));
        assert_eq!(rows[1].close, 2.0);
    }
}
