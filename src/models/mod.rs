mod date_range;
mod derived_metric;
mod performance;
mod stock_price;
mod universe;
pub mod indicators;

pub use date_range::DateRange;
pub use derived_metric::DerivedMetric;
pub use performance::{Direction, PerformanceMetric, RankingPeriod};
pub use stock_price::{sort_and_dedup_by_date, StockPrice};
pub use universe::Universe;

use std::collections::BTreeMap;

/// Price series for a single symbol, chronological
pub type PriceSeries = Vec<StockPrice>;

/// Series keyed by symbol (sorted for stable output)
pub type SeriesBySymbol = BTreeMap<String, PriceSeries>;
