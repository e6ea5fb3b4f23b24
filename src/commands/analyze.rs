use super::query::print_table;
use super::{block_on, exit_with};
use crate::constants::{
    DEFAULT_ABOVE_MA_WINDOW, DEFAULT_ANALYSIS_DAYS, DEFAULT_LONG_WINDOW, DEFAULT_SHORT_WINDOW, SPIKE_THRESHOLD,
};
use crate::error::{AppError, Result};
use crate::models::{DateRange, Direction, PerformanceMetric};
use crate::services::analysis::{
    analyze_volume, detect_spikes, ma_trend, market_summary, moving_averages, performance, price_changes_for_date,
    rank_performers, stocks_above_ma, volume_insight,
};
use crate::services::Storage;
use crate::utils::{format_number, parse_optional_date};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;

const TABLE_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AnalysisKind {
    PriceChanges,
    Performers,
    Spikes,
    MovingAverages,
    Volume,
    AboveMa,
}

pub fn run(kind: AnalysisKind, symbol: Option<String>, date: Option<String>, days: Option<i64>) {
    if let Err(e) = block_on(analyze(kind, symbol, date, days.unwrap_or(DEFAULT_ANALYSIS_DAYS))) {
        exit_with(e);
    }
}

fn rows_table<T: Serialize>(rows: &[T]) -> Result<()> {
    let values = rows.iter().map(serde_json::to_value).collect::<std::result::Result<Vec<_>, _>>()?;
    print_table(&values);
    Ok(())
}

fn require_symbol(symbol: Option<String>) -> Result<String> {
    symbol
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InvalidInput("--symbol is required for this analysis".to_string()))
}

async fn resolve_date(storage: &Storage, date: Option<String>) -> Result<NaiveDate> {
    match parse_optional_date(date.as_deref())? {
        Some(date) => Ok(date),
        None => storage
            .latest_date()
            .await?
            .ok_or_else(|| AppError::NotFound("No data available. Run 'fetch' first.".to_string())),
    }
}

async fn analyze(kind: AnalysisKind, symbol: Option<String>, date: Option<String>, days: i64) -> Result<()> {
    let storage = Storage::from_env().await;
    let date = resolve_date(&storage, date).await?;
    let range = DateRange::last_days(date, days)?;

    match kind {
        AnalysisKind::PriceChanges => {
            let (previous, changes) = price_changes_for_date(&storage, date).await?;
            let Some(summary) = market_summary(&changes) else {
                println!("⚠️  No data available for {}", date);
                return Ok(());
            };
            match previous {
                Some(previous) => println!("📊 Price changes {} vs {}\n", date, previous),
                None => println!("📊 Intraday changes on {}\n", date),
            }
            println!("{}\n", summary.describe());
            rows_table(&changes[..changes.len().min(TABLE_ROWS)])?;
        }
        AnalysisKind::Performers => {
            let perfs = performance(&storage.load_all(&range).await?);
            println!("🏆 Top performers by return, {}\n", range);
            rows_table(&rank_performers(perfs, PerformanceMetric::Return, Direction::Best, TABLE_ROWS))?;
        }
        AnalysisKind::Spikes => {
            let symbol = require_symbol(symbol)?;
            let series = storage.load_range(&symbol, &range).await?;
            match detect_spikes(&series, SPIKE_THRESHOLD) {
                Some(spikes) if spikes.is_empty() => println!("No unusual moves for {} in {}", symbol, range),
                Some(spikes) => {
                    println!("⚡ {} spikes for {} in {}\n", spikes.len(), symbol, range);
                    rows_table(&spikes)?;
                }
                None => println!("⚠️  Not enough data for spike detection ({} rows)", series.len()),
            }
        }
        AnalysisKind::MovingAverages => {
            let symbol = require_symbol(symbol)?;
            let series = storage.load_range(&symbol, &range).await?;
            let Some(rows) = moving_averages(&series, DEFAULT_SHORT_WINDOW, DEFAULT_LONG_WINDOW) else {
                println!(
                    "⚠️  Not enough data for {}-day MA ({} rows). Try a larger --days.",
                    DEFAULT_LONG_WINDOW,
                    series.len()
                );
                return Ok(());
            };
            if let Some(trend) = ma_trend(&rows) {
                println!("{}\n", trend.message(DEFAULT_SHORT_WINDOW, DEFAULT_LONG_WINDOW));
            }
            rows_table(&rows[rows.len().saturating_sub(TABLE_ROWS)..])?;
        }
        AnalysisKind::Volume => {
            let symbol = require_symbol(symbol)?;
            let series = storage.load_range(&symbol, &range).await?;
            let Some(analysis) = analyze_volume(&series) else {
                println!("⚠️  No data for {} in {}", symbol, range);
                return Ok(());
            };
            if let Some(avg) = analysis.average_volume() {
                println!("📦 Average volume: {}", format_number(avg.round() as usize));
            }
            if let Some(r) = analysis.price_volume_correlation {
                println!("🔗 Price/volume change correlation: {:.2}", r);
            }
            if let Some(insight) = volume_insight(&analysis) {
                println!("{}\n", insight.message());
            }
            rows_table(&analysis.rows[analysis.rows.len().saturating_sub(TABLE_ROWS)..])?;
        }
        AnalysisKind::AboveMa => {
            let hits = stocks_above_ma(&storage, date, DEFAULT_ABOVE_MA_WINDOW).await?;
            println!(
                "📈 {} stocks above their {}-day MA on {}\n",
                hits.len(),
                DEFAULT_ABOVE_MA_WINDOW,
                date
            );
            rows_table(&hits)?;
        }
    }
    Ok(())
}
