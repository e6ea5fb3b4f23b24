use super::closes;
use crate::error::Result;
use crate::models::indicators::{calculate_ma_score, rolling_mean};
use crate::models::{DateRange, StockPrice};
use crate::services::Storage;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

/// One date with both moving averages defined
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaRow {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
    pub ma_short: f64,
    pub ma_long: f64,
}

/// Short and long simple moving averages of the close
///
/// Returns `None` when the series is shorter than `long` or the windows are
/// not increasing. Leading dates without a full long window are dropped.
pub fn moving_averages(series: &[StockPrice], short: usize, long: usize) -> Option<Vec<MaRow>> {
    if short == 0 || short >= long || series.len() < long {
        return None;
    }

    let values = closes(series);
    let ma_short = rolling_mean(&values, short);
    let ma_long = rolling_mean(&values, long);

    Some(
        series
            .iter()
            .zip(ma_short.into_iter().zip(ma_long))
            .filter_map(|(row, (s, l))| {
                Some(MaRow {
                    date: row.date,
                    close: row.close,
                    volume: row.volume,
                    ma_short: s?,
                    ma_long: l?,
                })
            })
            .collect(),
    )
}

/// Relationship of the latest close to its two averages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaTrend {
    Bullish,
    Mixed,
    BelowBoth,
    PossibleReversal,
    Neutral,
}

impl MaTrend {
    pub fn message(&self, short: usize, long: usize) -> String {
        match self {
            MaTrend::Bullish => format!("🟢 Bullish trend: Price > {}-day MA > {}-day MA", short, long),
            MaTrend::Mixed => format!("🟡 Mixed signals: {}-day MA > Price > {}-day MA", short, long),
            MaTrend::BelowBoth => {
                format!("🔴 Price below both MAs: {}-day MA > {}-day MA > Price", short, long)
            }
            MaTrend::PossibleReversal => format!(
                "🟡 Possible trend reversal: Price > {}-day MA while {}-day MA < {}-day MA",
                short, short, long
            ),
            MaTrend::Neutral => "⚪ No clear trend between price and moving averages".to_string(),
        }
    }
}

/// Classify the last row of a moving average table
pub fn ma_trend(rows: &[MaRow]) -> Option<MaTrend> {
    let last = rows.last()?;
    let (close, s, l) = (last.close, last.ma_short, last.ma_long);

    Some(if close > s && s > l {
        MaTrend::Bullish
    } else if s > close && close > l {
        MaTrend::Mixed
    } else if s > l && l > close {
        MaTrend::BelowBoth
    } else if s < l && close > s {
        MaTrend::PossibleReversal
    } else {
        MaTrend::Neutral
    })
}

/// A symbol closing above its moving average
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AboveMa {
    pub symbol: String,
    pub close: f64,
    pub ma: f64,
    pub difference_pct: f64,
}

/// Check the last row of `series` against its `window`-day average
pub fn above_ma(symbol: &str, series: &[StockPrice], window: usize) -> Option<AboveMa> {
    if window == 0 || series.len() < window {
        return None;
    }
    let last = series.last()?;
    let ma = (*rolling_mean(&closes(series), window).last()?)?;
    (last.close > ma).then(|| AboveMa {
        symbol: symbol.to_string(),
        close: last.close,
        ma,
        difference_pct: calculate_ma_score(last.close, ma),
    })
}

/// Symbols closing above their `window`-day average on `date`
///
/// The look-back starts `window` available dates before `date`; nothing is
/// returned when `date` has no data or fewer than `window` dates precede it.
/// Sorted by distance above the average, largest first.
pub async fn stocks_above_ma(storage: &Storage, date: NaiveDate, window: usize) -> Result<Vec<AboveMa>> {
    let dates = storage.available_dates().await?;
    let Some(idx) = dates.iter().position(|d| *d == date) else {
        warn!("No data available for date {}", date);
        return Ok(Vec::new());
    };
    if window == 0 || idx < window {
        warn!("Insufficient historical data for {}-day MA calculation", window);
        return Ok(Vec::new());
    }

    let range = DateRange::new(dates[idx - window], date)?;
    let mut results = Vec::new();
    for symbol in storage.available_symbols(Some(date)).await? {
        let series = storage.load_range(&symbol, &range).await?;
        if let Some(hit) = above_ma(&symbol, &series, window) {
            results.push(hit);
        }
    }

    results.sort_by(|a, b| {
        b.difference_pct
            .partial_cmp(&a.difference_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis::fixtures::series;

    #[test]
    fn test_moving_averages_match_reference() {
        let closes: Vec<f64> = (1..=25).map(|i| i as f64 * 2.0).collect();
        let rows = moving_averages(&series("A.NS", &closes, &[10; 25]), 5, 20).unwrap();

        // first full 20-day window ends at index 19
        assert_eq!(rows.len(), 6);
        let reference_long = closes[0..20].iter().sum::<f64>() / 20.0;
        let reference_short = closes[15..20].iter().sum::<f64>() / 5.0;
        assert!((rows[0].ma_long - reference_long).abs() < 1e-9);
        assert!((rows[0].ma_short - reference_short).abs() < 1e-9);
        assert_eq!(rows[0].close, 40.0);
    }

    #[test]
    fn test_moving_averages_insufficient_data() {
        let s = series("A.NS", &[1.0; 10], &[1; 10]);
        assert!(moving_averages(&s, 5, 20).is_none());
        assert!(moving_averages(&s, 5, 5).is_none());
    }

    #[test]
    fn test_ma_trend_classification() {
        let row = |close, s, l| MaRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            close,
            volume: 0,
            ma_short: s,
            ma_long: l,
        };
        assert_eq!(ma_trend(&[row(12.0, 11.0, 10.0)]), Some(MaTrend::Bullish));
        assert_eq!(ma_trend(&[row(10.5, 11.0, 10.0)]), Some(MaTrend::Mixed));
        assert_eq!(ma_trend(&[row(9.0, 11.0, 10.0)]), Some(MaTrend::BelowBoth));
        assert_eq!(ma_trend(&[row(10.5, 10.0, 11.0)]), Some(MaTrend::PossibleReversal));
        assert_eq!(ma_trend(&[row(9.0, 10.0, 11.0)]), Some(MaTrend::Neutral));
        assert_eq!(ma_trend(&[]), None);
    }

    #[test]
    fn test_above_ma() {
        let rising = series("A.NS", &[10.0, 11.0, 12.0, 13.0], &[1; 4]);
        let hit = above_ma("A.NS", &rising, 3).unwrap();
        assert_eq!(hit.ma, 12.0);
        assert!((hit.difference_pct - (1.0 / 12.0 * 100.0)).abs() < 1e-9);

        let falling = series("B.NS", &[13.0, 12.0, 11.0, 10.0], &[1; 4]);
        assert!(above_ma("B.NS", &falling, 3).is_none());
        assert!(above_ma("B.NS", &falling[..2], 3).is_none());
    }

    #[tokio::test]
    async fn test_stocks_above_ma_uses_available_dates() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::csv_only(dir.path().to_path_buf());
        let mut rows = series("UP.NS", &[10.0, 11.0, 12.0, 13.0, 14.0], &[1; 5]);
        rows.extend(series("DOWN.NS", &[14.0, 13.0, 12.0, 11.0, 10.0], &[1; 5]));
        storage.save(&rows).await.unwrap();

        let last = rows[4].date;
        let hits = stocks_above_ma(&storage, last, 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].symbol, "UP.NS");

        // only four dates precede the last one
        assert!(stocks_above_ma(&storage, last, 5).await.unwrap().is_empty());
    }
}
