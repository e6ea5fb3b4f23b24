//! Descriptive analysis over stored price series
//!
//! Everything here is a pure function over [`StockPrice`] slices except the
//! `*_for_*` helpers, which load their inputs through [`Storage`] first.
//!
//! [`Storage`]: crate::services::Storage

pub mod correlation;
pub mod metrics;
pub mod moving_average;
pub mod performance;
pub mod price_change;
pub mod spikes;
pub mod summary;
pub mod volume;

pub use correlation::{correlation_matrix, CorrelationMatrix};
pub use metrics::derive_metrics;
pub use moving_average::{ma_trend, moving_averages, stocks_above_ma, AboveMa, MaRow, MaTrend};
pub use performance::{performance, rank_performers, Performance};
pub use price_change::{price_changes, price_changes_for_date, PriceChange};
pub use spikes::{detect_spikes, Spike};
pub use summary::{market_summary, symbol_summary, top_volume, MarketSummary, SymbolSummary};
pub use volume::{analyze_volume, volume_insight, VolumeAnalysis, VolumeInsight, VolumeRow};

use crate::models::StockPrice;

/// Calculate price change and percentage change
///
/// The percentage is 0 when `previous` is not positive.
pub fn calculate_price_change(current: f64, previous: f64) -> (f64, f64) {
    let change = current - previous;
    let change_percent = if previous > 0.0 {
        (change / previous) * 100.0
    } else {
        0.0
    };
    (change, change_percent)
}

/// Validate and parse limit parameter
pub fn validate_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(10).clamp(1, 100)
}

pub(crate) fn closes(series: &[StockPrice]) -> Vec<f64> {
    series.iter().map(|r| r.close).collect()
}

pub(crate) fn volumes(series: &[StockPrice]) -> Vec<f64> {
    series.iter().map(|r| r.volume as f64).collect()
}

/// Scale fractional changes to percentages
pub(crate) fn as_percent(values: Vec<Option<f64>>) -> Vec<Option<f64>> {
    values.into_iter().map(|v| v.map(|x| x * 100.0)).collect()
}
