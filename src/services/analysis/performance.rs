use super::{as_percent, closes};
use crate::models::indicators::{defined, mean, pct_change, sample_std};
use crate::models::{Direction, PerformanceMetric, SeriesBySymbol};
use serde::Serialize;
use std::cmp::Ordering;

/// Period statistics of one symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Performance {
    pub symbol: String,
    pub start_price: f64,
    pub end_price: f64,
    pub return_pct: f64,
    /// Sample std of daily returns in percent; needs at least two returns
    pub volatility_pct: Option<f64>,
    pub avg_volume: f64,
}

impl Performance {
    /// Value used for ranking by `metric`
    pub fn metric_value(&self, metric: PerformanceMetric) -> Option<f64> {
        match metric {
            PerformanceMetric::Return => Some(self.return_pct),
            PerformanceMetric::Volatility => self.volatility_pct,
            PerformanceMetric::Volume => Some(self.avg_volume),
        }
    }
}

/// Period statistics for every symbol with at least two rows
pub fn performance(series_by_symbol: &SeriesBySymbol) -> Vec<Performance> {
    series_by_symbol
        .iter()
        .filter(|(_, series)| series.len() >= 2)
        .filter_map(|(symbol, series)| {
            let first = series.first()?;
            let last = series.last()?;
            if first.close == 0.0 {
                return None;
            }

            let daily_returns = defined(&as_percent(pct_change(&closes(series))));
            let volumes: Vec<f64> = series.iter().map(|r| r.volume as f64).collect();

            Some(Performance {
                symbol: symbol.clone(),
                start_price: first.close,
                end_price: last.close,
                return_pct: (last.close / first.close - 1.0) * 100.0,
                volatility_pct: sample_std(&daily_returns),
                avg_volume: mean(&volumes).unwrap_or(0.0),
            })
        })
        .collect()
}

/// Sort by `metric` (descending for `Best`, ascending for `Worst`) and keep `limit`
///
/// Symbols without a value for the metric always sort last.
pub fn rank_performers(
    mut perfs: Vec<Performance>,
    metric: PerformanceMetric,
    direction: Direction,
    limit: usize,
) -> Vec<Performance> {
    perfs.sort_by(|a, b| {
        match (a.metric_value(metric), b.metric_value(metric)) {
            (Some(x), Some(y)) => {
                let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                match direction {
                    Direction::Best => ord.reverse(),
                    Direction::Worst => ord,
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| a.symbol.cmp(&b.symbol))
    });
    perfs.truncate(limit);
    perfs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis::fixtures::series;

    fn universe() -> SeriesBySymbol {
        let mut map = SeriesBySymbol::new();
        map.insert("UP.NS".into(), series("UP.NS", &[100.0, 105.0, 110.0], &[10, 20, 30]));
        map.insert("DOWN.NS".into(), series("DOWN.NS", &[100.0, 90.0, 80.0], &[5, 5, 5]));
        map.insert("FLAT.NS".into(), series("FLAT.NS", &[50.0, 50.0], &[100, 100]));
        map.insert("ONE.NS".into(), series("ONE.NS", &[50.0], &[100]));
        map
    }

    #[test]
    fn test_performance_stats() {
        let perfs = performance(&universe());
        assert_eq!(perfs.len(), 3);

        let up = perfs.iter().find(|p| p.symbol == "UP.NS").unwrap();
        assert!((up.return_pct - 10.0).abs() < 1e-9);
        assert_eq!(up.avg_volume, 20.0);
        assert!(up.volatility_pct.is_some());

        // one daily return is not enough for a sample std
        let flat = perfs.iter().find(|p| p.symbol == "FLAT.NS").unwrap();
        assert_eq!(flat.volatility_pct, None);
    }

    #[test]
    fn test_rank_best_and_worst() {
        let perfs = performance(&universe());
        let best = rank_performers(perfs.clone(), PerformanceMetric::Return, Direction::Best, 2);
        assert_eq!(best.iter().map(|p| p.symbol.as_str()).collect::<Vec<_>>(), vec!["UP.NS", "FLAT.NS"]);

        let worst = rank_performers(perfs.clone(), PerformanceMetric::Return, Direction::Worst, 10);
        assert_eq!(worst[0].symbol, "DOWN.NS");

        let by_volume = rank_performers(perfs.clone(), PerformanceMetric::Volume, Direction::Best, 1);
        assert_eq!(by_volume[0].symbol, "FLAT.NS");

        let by_vol = rank_performers(perfs, PerformanceMetric::Volatility, Direction::Worst, 10);
        assert_eq!(by_vol.last().unwrap().symbol, "FLAT.NS");
    }
}
