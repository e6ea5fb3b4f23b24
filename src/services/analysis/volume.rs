use super::{as_percent, closes, volumes};
use crate::constants::{HIGH_VOLUME_RATIO, LOW_VOLUME_RATIO, MIN_ROWS_FOR_CORRELATION, VOLUME_MA_WINDOW};
use crate::models::indicators::{mean, pct_change, pearson, rolling_mean};
use crate::models::StockPrice;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeRow {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
    pub volume_ma_5: Option<f64>,
    pub volume_change_pct: Option<f64>,
}

/// Per-day volume metrics plus the price/volume change correlation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeAnalysis {
    pub symbol: String,
    pub rows: Vec<VolumeRow>,
    /// Pearson correlation of daily close and volume changes; needs three
    /// days where both are defined
    pub price_volume_correlation: Option<f64>,
}

impl VolumeAnalysis {
    pub fn average_volume(&self) -> Option<f64> {
        let values: Vec<f64> = self.rows.iter().map(|r| r.volume as f64).collect();
        mean(&values)
    }

    pub fn latest_volume(&self) -> Option<u64> {
        self.rows.last().map(|r| r.volume)
    }
}

/// Volume analysis of one symbol's series, `None` for an empty series
pub fn analyze_volume(series: &[StockPrice]) -> Option<VolumeAnalysis> {
    let first = series.first()?;

    let volume_values = volumes(series);
    let volume_ma = rolling_mean(&volume_values, VOLUME_MA_WINDOW);
    let volume_changes = pct_change(&volume_values);
    let price_changes = pct_change(&closes(series));

    let (xs, ys): (Vec<f64>, Vec<f64>) = price_changes
        .iter()
        .zip(&volume_changes)
        .filter_map(|(p, v)| Some(((*p)?, (*v)?)))
        .unzip();
    let price_volume_correlation = if xs.len() >= MIN_ROWS_FOR_CORRELATION {
        pearson(&xs, &ys)
    } else {
        None
    };

    let rows = series
        .iter()
        .zip(volume_ma)
        .zip(as_percent(volume_changes))
        .map(|((row, ma), change)| VolumeRow {
            date: row.date,
            close: row.close,
            volume: row.volume,
            volume_ma_5: ma,
            volume_change_pct: change,
        })
        .collect();

    Some(VolumeAnalysis {
        symbol: first.symbol.clone(),
        rows,
        price_volume_correlation,
    })
}

/// How the latest volume compares to the period average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeInsight {
    High,
    Low,
    Normal,
}

impl VolumeInsight {
    pub fn message(&self) -> &'static str {
        match self {
            VolumeInsight::High => "📈 Significantly higher volume than average - could indicate strong movement",
            VolumeInsight::Low => "📉 Significantly lower volume than average - could indicate weak movement",
            VolumeInsight::Normal => "Volume is in line with the period average",
        }
    }
}

/// Latest volume of the analysis against its period average
pub fn volume_insight(analysis: &VolumeAnalysis) -> Option<VolumeInsight> {
    let latest = analysis.latest_volume()? as f64;
    let average = analysis.average_volume()?;
    Some(classify(latest, average))
}

fn classify(latest: f64, average: f64) -> VolumeInsight {
    if latest > average * HIGH_VOLUME_RATIO {
        VolumeInsight::High
    } else if latest < average * LOW_VOLUME_RATIO {
        VolumeInsight::Low
    } else {
        VolumeInsight::Normal
    }
}
