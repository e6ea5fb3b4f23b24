use super::calculate_price_change;
use crate::error::Result;
use crate::models::StockPrice;
use crate::services::Storage;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// Close-to-close move of one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceChange {
    pub symbol: String,
    pub close: f64,
    /// Previous close, or the day's open when no previous day exists
    pub previous: f64,
    pub change: f64,
    pub change_pct: f64,
}

/// Per-symbol change of `current` against `previous_day`
///
/// Without a previous day the move is measured intraday (open → close).
/// With one, symbols missing from either day are left out. Sorted by
/// `change_pct`, largest gain first.
pub fn price_changes(current: &[StockPrice], previous_day: Option<&[StockPrice]>) -> Vec<PriceChange> {
    // last row per symbol wins
    let latest = |rows: &[StockPrice]| -> HashMap<String, StockPrice> {
        rows.iter().map(|r| (r.symbol.clone(), r.clone())).collect()
    };
    let current = latest(current);

    let mut changes: Vec<PriceChange> = match previous_day {
        None => current
            .values()
            .map(|row| {
                let (change, change_pct) = calculate_price_change(row.close, row.open);
                PriceChange {
                    symbol: row.symbol.clone(),
                    close: row.close,
                    previous: row.open,
                    change,
                    change_pct,
                }
            })
            .collect(),
        Some(previous) => {
            let previous = latest(previous);
            current
                .values()
                .filter_map(|row| {
                    let prev = previous.get(&row.symbol)?;
                    let (change, change_pct) = calculate_price_change(row.close, prev.close);
                    Some(PriceChange {
                        symbol: row.symbol.clone(),
                        close: row.close,
                        previous: prev.close,
                        change,
                        change_pct,
                    })
                })
                .collect()
        }
    };

    changes.sort_by(|a, b| {
        b.change_pct
            .partial_cmp(&a.change_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    changes
}

/// Changes on `date` against the previous available date
///
/// Returns the previous date used (if any) with the changes.
pub async fn price_changes_for_date(
    storage: &Storage,
    date: NaiveDate,
) -> Result<(Option<NaiveDate>, Vec<PriceChange>)> {
    let current = storage.load_day(date).await?;
    if current.is_empty() {
        return Ok((None, Vec::new()));
    }

    match storage.previous_date(date).await? {
        Some(prev_date) => {
            let previous = storage.load_day(prev_date).await?;
            Ok((Some(prev_date), price_changes(&current, Some(&previous))))
        }
        None => Ok((None, price_changes(&current, None))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis::fixtures::d;

    fn bar(symbol: &str, date: &str, open: f64, close: f64) -> StockPrice {
        StockPrice::new(symbol, d(date), open, open.max(close), open.min(close), close, 100)
    }

    #[test]
    fn test_changes_against_previous_day() {
        let prev = vec![bar("A.NS", "2024-01-01", 1.0, 100.0), bar("B.NS", "2024-01-01", 1.0, 50.0)];
        let curr = vec![
            bar("A.NS", "2024-01-02", 1.0, 110.0),
            bar("B.NS", "2024-01-02", 1.0, 45.0),
            bar("C.NS", "2024-01-02", 1.0, 10.0),
        ];

        let changes = price_changes(&curr, Some(&prev));
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].symbol, "A.NS");
        assert!((changes[0].change_pct - 10.0).abs() < 1e-9);
        assert_eq!(changes[1].symbol, "B.NS");
        assert!((changes[1].change - (-5.0)).abs() < 1e-9);
        assert!((changes[1].change_pct - (-10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_intraday_fallback() {
        let curr = vec![bar("A.NS", "2024-01-02", 200.0, 210.0)];
        let changes = price_changes(&curr, None);
        assert_eq!(changes[0].previous, 200.0);
        assert!((changes[0].change_pct - 5.0).abs() < 1e-9);
    }
}
