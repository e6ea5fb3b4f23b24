use super::PriceChange;
use crate::models::indicators::mean;
use crate::models::StockPrice;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

/// Breadth of one day's moves
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub total: usize,
    pub gainers: usize,
    pub losers: usize,
    pub unchanged: usize,
    pub avg_change_pct: f64,
    pub top_gainer: PriceChange,
    pub top_loser: PriceChange,
}

impl MarketSummary {
    pub fn describe(&self) -> String {
        format!(
            "{} stocks tracked: {} up, {} down, {} unchanged (average move {:+.2}%). Top gainer {} ({:+.2}%), top loser {} ({:+.2}%).",
            self.total,
            self.gainers,
            self.losers,
            self.unchanged,
            self.avg_change_pct,
            self.top_gainer.symbol,
            self.top_gainer.change_pct,
            self.top_loser.symbol,
            self.top_loser.change_pct,
        )
    }
}

pub fn market_summary(changes: &[PriceChange]) -> Option<MarketSummary> {
    let mut sorted = changes.to_vec();
    sorted.sort_by(|a, b| b.change_pct.partial_cmp(&a.change_pct).unwrap_or(Ordering::Equal));

    let top_gainer = sorted.first()?.clone();
    let top_loser = sorted.last()?.clone();
    let pcts: Vec<f64> = sorted.iter().map(|c| c.change_pct).collect();

    Some(MarketSummary {
        total: sorted.len(),
        gainers: pcts.iter().filter(|p| **p > 0.0).count(),
        losers: pcts.iter().filter(|p| **p < 0.0).count(),
        unchanged: pcts.iter().filter(|p| **p == 0.0).count(),
        avg_change_pct: mean(&pcts).unwrap_or(0.0),
        top_gainer,
        top_loser,
    })
}

/// Period overview of one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolSummary {
    pub symbol: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub last_price: f64,
    pub change_pct: f64,
    pub high: f64,
    pub low: f64,
    pub avg_volume: f64,
}

impl SymbolSummary {
    pub fn describe(&self) -> String {
        format!(
            "{} from {} to {}: last price ₹{:.2} ({:+.2}%), range ₹{:.2} - ₹{:.2}, average volume {:.0}.",
            self.symbol, self.start, self.end, self.last_price, self.change_pct, self.low, self.high, self.avg_volume
        )
    }
}

/// `None` for an empty series
pub fn symbol_summary(symbol: &str, series: &[StockPrice]) -> Option<SymbolSummary> {
    let first = series.first()?;
    let last = series.last()?;
    let volumes: Vec<f64> = series.iter().map(|r| r.volume as f64).collect();

    Some(SymbolSummary {
        symbol: symbol.to_string(),
        start: first.date,
        end: last.date,
        last_price: last.close,
        change_pct: super::calculate_price_change(last.close, first.close).1,
        high: series.iter().map(|r| r.high).fold(f64::MIN, f64::max),
        low: series.iter().map(|r| r.low).fold(f64::MAX, f64::min),
        avg_volume: mean(&volumes).unwrap_or(0.0),
    })
}

/// Most traded rows of a day
pub fn top_volume(day_rows: &[StockPrice], limit: usize) -> Vec<StockPrice> {
    let mut rows = day_rows.to_vec();
    rows.sort_by(|a, b| b.volume.cmp(&a.volume).then_with(|| a.symbol.cmp(&b.symbol)));
    rows.truncate(limit);
    rows
}
