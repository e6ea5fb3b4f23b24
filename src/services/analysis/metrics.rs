use super::{as_percent, closes, volumes};
use crate::constants::{indicator, DEFAULT_LONG_WINDOW, DEFAULT_SHORT_WINDOW, VOLUME_MA_WINDOW};
use crate::models::indicators::{pct_change, rolling_mean};
use crate::models::{DerivedMetric, StockPrice};

/// Indicator rows for a single symbol's date-sorted series
///
/// Only defined values are emitted, so a short series yields fewer rows
/// rather than placeholders.
pub fn derive_metrics(series: &[StockPrice]) -> Vec<DerivedMetric> {
    let close_values = closes(series);
    let volume_values = volumes(series);

    let columns: [(&str, Vec<Option<f64>>); 5] = [
        (indicator::MA_SHORT, rolling_mean(&close_values, DEFAULT_SHORT_WINDOW)),
        (indicator::MA_LONG, rolling_mean(&close_values, DEFAULT_LONG_WINDOW)),
        (indicator::RETURN_PCT, as_percent(pct_change(&close_values))),
        (indicator::VOLUME_CHANGE_PCT, as_percent(pct_change(&volume_values))),
        (indicator::VOLUME_MA, rolling_mean(&volume_values, VOLUME_MA_WINDOW)),
    ];

    let mut metrics = Vec::new();
    for (name, values) in columns.iter() {
        for (row, value) in series.iter().zip(values) {
            if let Some(value) = value {
                metrics.push(DerivedMetric::new(&row.symbol, row.date, *name, *value));
            }
        }
    }
    metrics
}
