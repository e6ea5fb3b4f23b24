use super::{as_percent, closes, volumes};
use crate::constants::MIN_ROWS_FOR_SPIKES;
use crate::models::indicators::{defined, mean, pct_change, sample_std};
use crate::models::StockPrice;
use chrono::NaiveDate;
use serde::Serialize;

/// A day whose return or volume change is unusually far from the mean
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spike {
    pub date: NaiveDate,
    pub close: f64,
    pub return_pct: f64,
    pub volume: u64,
    pub volume_change_pct: f64,
    /// "price up", "price down", "volume", or a comma-joined combination
    pub kind: String,
    /// Largest absolute z-score of the two changes
    pub severity: f64,
}

fn z_score(value: f64, mean: Option<f64>, std: Option<f64>) -> f64 {
    match (mean, std) {
        (Some(m), Some(s)) if s > 0.0 => ((value - m) / s).abs(),
        _ => 0.0,
    }
}

/// Flag days whose daily return or volume change exceeds `threshold` standard
/// deviations
///
/// Returns `None` for series shorter than five rows.
pub fn detect_spikes(series: &[StockPrice], threshold: f64) -> Option<Vec<Spike>> {
    if series.len() < MIN_ROWS_FOR_SPIKES {
        return None;
    }

    let returns = as_percent(pct_change(&closes(series)));
    let volume_changes = as_percent(pct_change(&volumes(series)));

    let return_values = defined(&returns);
    let volume_values = defined(&volume_changes);
    let (return_mean, return_std) = (mean(&return_values), sample_std(&return_values));
    let (volume_mean, volume_std) = (mean(&volume_values), sample_std(&volume_values));

    let mut spikes = Vec::new();
    for (i, row) in series.iter().enumerate() {
        let (Some(ret), Some(vol)) = (returns[i], volume_changes[i]) else {
            continue;
        };

        let price_z = z_score(ret, return_mean, return_std);
        let volume_z = z_score(vol, volume_mean, volume_std);
        let price_spike = price_z > threshold;
        let volume_spike = volume_z > threshold;
        if !price_spike && !volume_spike {
            continue;
        }

        let mut kind = Vec::new();
        if price_spike {
            kind.push(if ret > 0.0 { "price up" } else { "price down" });
        }
        if volume_spike {
            kind.push("volume");
        }

        spikes.push(Spike {
            date: row.date,
            close: row.close,
            return_pct: ret,
            volume: row.volume,
            volume_change_pct: vol,
            kind: kind.join(", "),
            severity: price_z.max(volume_z),
        });
    }
    Some(spikes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::analysis::fixtures::series;

    #[test]
    fn test_detects_price_and_volume_spike() {
        // flat market with one big jump on day 8 (index 7)
        let mut closes = vec![100.0; 12];
        let mut vols = vec![1_000u64; 12];
        for (i, c) in closes.iter_mut().enumerate() {
            *c += (i % 2) as f64 * 0.5;
        }
        for c in closes.iter_mut().skip(7) {
            *c += 20.0;
        }
        vols[7] = 10_000;

        let spikes = detect_spikes(&series("A.NS", &closes, &vols), 2.0).unwrap();
        assert!(!spikes.is_empty());
        let jump = spikes.iter().find(|s| s.date == series("A.NS", &closes, &vols)[7].date).unwrap();
        assert!(jump.kind.contains("price up"));
        assert!(jump.kind.contains("volume"));
        assert!(jump.severity > 2.0);
    }

    #[test]
    fn test_requires_five_rows() {
        assert!(detect_spikes(&series("A.NS", &[1.0, 2.0, 3.0, 4.0], &[1, 1, 1, 1]), 2.0).is_none());
    }

    #[test]
    fn test_constant_series_has_no_spikes() {
        let spikes = detect_spikes(&series("A.NS", &[5.0; 8], &[100; 8]), 2.0).unwrap();
        assert!(spikes.is_empty());
    }
}
