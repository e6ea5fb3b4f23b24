use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One indicator value for a symbol on a date
///
/// Always recomputed from stored prices, never edited directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetric {
    pub symbol: String,
    pub date: NaiveDate,
    /// Indicator name, see `constants::indicator`
    pub indicator: String,
    pub value: f64,
}

impl DerivedMetric {
    pub fn new(symbol: impl Into<String>, date: NaiveDate, indicator: impl Into<String>, value: f64) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            indicator: indicator.into(),
            value,
        }
    }
}
