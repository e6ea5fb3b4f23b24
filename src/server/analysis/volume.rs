//! Volume and spike endpoints

use super::{load_symbol_range, AnalysisResponse, SymbolRangeQuery};
use crate::constants::{MIN_ROWS_FOR_SPIKES, SPIKE_THRESHOLD};
use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::services::analysis::{analyze_volume, detect_spikes, volume_insight, Spike, VolumeAnalysis, VolumeInsight};
use crate::services::charts::volume_chart;
use crate::services::Figure;
use axum::extract::{Json, State};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

#[derive(Debug, Serialize)]
pub struct VolumeResponse {
    pub average_volume: Option<f64>,
    pub latest_volume: Option<u64>,
    pub insight: Option<VolumeInsight>,
    pub insight_message: Option<String>,
    pub analysis: VolumeAnalysis,
    pub chart: Figure,
}

/// GET /analysis/volume?symbol=TCS.NS&start_date=2024-01-01&end_date=2024-01-31
#[instrument(skip(app_state))]
pub async fn volume_handler(
    State(app_state): State<AppState>,
    Query(params): Query<SymbolRangeQuery>,
) -> Result<Json<AnalysisResponse<VolumeResponse>>> {
    let (range, series) = load_symbol_range(&app_state, &params).await?;
    let analysis = analyze_volume(&series)
        .ok_or_else(|| AppError::NotFound(format!("No volume data for {}", params.symbol)))?;
    let insight = volume_insight(&analysis);

    Ok(Json(AnalysisResponse::new(
        range.end,
        "volume",
        series.len(),
        VolumeResponse {
            average_volume: analysis.average_volume(),
            latest_volume: analysis.latest_volume(),
            insight,
            insight_message: insight.map(|i| i.message().to_string()),
            chart: volume_chart(&analysis, &analysis.symbol),
            analysis,
        },
    )))
}

#[derive(Debug, Default, Deserialize)]
pub struct SpikesQuery {
    pub symbol: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Standard deviations from the mean (default: 2.0)
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SpikesResponse {
    pub symbol: String,
    pub threshold: f64,
    pub spikes: Vec<Spike>,
}

/// GET /analysis/spikes?symbol=TCS.NS&threshold=2.5
#[instrument(skip(app_state))]
pub async fn spikes_handler(
    State(app_state): State<AppState>,
    Query(params): Query<SpikesQuery>,
) -> Result<Json<AnalysisResponse<SpikesResponse>>> {
    let threshold = params.threshold.unwrap_or(SPIKE_THRESHOLD);
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(AppError::InvalidInput(format!("threshold must be positive, got {}", threshold)));
    }

    let range_query = SymbolRangeQuery {
        symbol: params.symbol,
        start_date: params.start_date,
        end_date: params.end_date,
    };
    let (range, series) = load_symbol_range(&app_state, &range_query).await?;
    let spikes = detect_spikes(&series, threshold).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Not enough data for spike detection: {} rows, need at least {}",
            series.len(),
            MIN_ROWS_FOR_SPIKES
        ))
    })?;
    info!("{} spikes for {} over {}", spikes.len(), range_query.symbol, range);

    Ok(Json(AnalysisResponse::new(
        range.end,
        "spikes",
        series.len(),
        SpikesResponse {
            symbol: range_query.symbol,
            threshold,
            spikes,
        },
    )))
}
