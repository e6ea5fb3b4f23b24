//! Price change and performer ranking endpoints

use super::{AnalysisQuery, AnalysisResponse};
use crate::error::{AppError, Result};
use crate::models::{DateRange, Direction, PerformanceMetric, RankingPeriod};
use crate::server::AppState;
use crate::services::analysis::{
    market_summary, performance, price_changes_for_date, rank_performers, validate_limit, MarketSummary, Performance,
    PriceChange,
};
use crate::services::charts::{performance_distribution, top_performers_chart};
use crate::services::Figure;
use axum::extract::{Json, State};
use axum_extra::extract::Query;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Day-over-day changes with the market summary
#[derive(Debug, Serialize)]
pub struct PriceChangesResponse {
    pub previous_date: Option<NaiveDate>,
    pub summary: Option<MarketSummary>,
    pub description: Option<String>,
    pub gainers: Vec<PriceChange>,
    pub losers: Vec<PriceChange>,
}

/// GET /analysis/price-changes?date=2024-01-05&limit=10
///
/// Compares `date` with the previous stored date, or open to close when it
/// is the first stored date.
#[instrument(skip(app_state))]
pub async fn price_changes_handler(
    State(app_state): State<AppState>,
    Query(params): Query<AnalysisQuery>,
) -> Result<Json<AnalysisResponse<PriceChangesResponse>>> {
    let date = app_state.resolve_date(params.date.as_deref()).await?;
    let limit = validate_limit(params.limit);

    let (previous_date, changes) = price_changes_for_date(&app_state.storage, date).await?;
    if changes.is_empty() {
        return Err(AppError::NotFound(format!("No data available for {}", date)));
    }

    let summary = market_summary(&changes);
    let gainers: Vec<PriceChange> = changes.iter().filter(|c| c.change_pct > 0.0).take(limit).cloned().collect();
    let losers: Vec<PriceChange> = changes
        .iter()
        .rev()
        .filter(|c| c.change_pct < 0.0)
        .take(limit)
        .cloned()
        .collect();

    info!("Price changes for {}: {} symbols", date, changes.len());
    Ok(Json(AnalysisResponse::new(
        date,
        "price_changes",
        changes.len(),
        PriceChangesResponse {
            previous_date,
            description: summary.as_ref().map(|s| s.describe()),
            summary,
            gainers,
            losers,
        },
    )))
}

/// Query parameters for performer ranking
#[derive(Debug, Default, Deserialize)]
pub struct PerformersQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,

    /// Look-back ending at `end_date`: 1d, 1w or 1m. Overrides `start_date`.
    pub period: Option<String>,

    /// return (default), volatility or volume
    pub metric: Option<String>,

    /// best (default) or worst
    pub direction: Option<String>,

    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PerformersResponse {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub metric: PerformanceMetric,
    pub direction: Direction,
    pub performers: Vec<Performance>,
    pub chart: Figure,
    pub distribution: Figure,
}

async fn performers_range(app_state: &AppState, params: &PerformersQuery) -> Result<DateRange> {
    match params.period.as_deref() {
        Some(period) => {
            let period = RankingPeriod::from_str(period).map_err(AppError::InvalidInput)?;
            let end = app_state.resolve_date(params.end_date.as_deref()).await?;
            DateRange::last_days(end, period.days())
        }
        None => {
            app_state
                .resolve_range(params.start_date.as_deref(), params.end_date.as_deref())
                .await
        }
    }
}

/// GET /analysis/performers
///
/// Examples:
/// - /analysis/performers?period=1w
/// - /analysis/performers?start_date=2024-01-01&end_date=2024-03-31&metric=volatility&direction=worst&limit=5
#[instrument(skip(app_state))]
pub async fn performers_handler(
    State(app_state): State<AppState>,
    Query(params): Query<PerformersQuery>,
) -> Result<Json<AnalysisResponse<PerformersResponse>>> {
    let metric = match params.metric.as_deref() {
        Some(m) => PerformanceMetric::from_str(m).map_err(AppError::InvalidInput)?,
        None => PerformanceMetric::default(),
    };
    let direction = match params.direction.as_deref() {
        Some(d) => Direction::from_str(d).map_err(AppError::InvalidInput)?,
        None => Direction::default(),
    };
    let limit = validate_limit(params.limit);
    let range = performers_range(&app_state, &params).await?;

    let series = app_state.storage.load_all(&range).await?;
    let perfs = performance(&series);
    let distribution = performance_distribution(&perfs, metric);
    let total = perfs.len();
    let ranked = rank_performers(perfs, metric, direction, limit);

    let bars: Vec<(String, f64)> = ranked
        .iter()
        .filter_map(|p| Some((p.symbol.clone(), p.metric_value(metric)?)))
        .collect();
    let chart = top_performers_chart(&bars, metric.label(), limit, direction == Direction::Worst);

    Ok(Json(AnalysisResponse::new(
        range.end,
        "performers",
        total,
        PerformersResponse {
            start_date: range.start,
            end_date: range.end,
            metric,
            direction,
            performers: ranked,
            chart,
            distribution,
        },
    )))
}
