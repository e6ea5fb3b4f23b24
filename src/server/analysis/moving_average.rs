//! Moving average endpoints

use super::{load_symbol_range, AnalysisResponse, SymbolRangeQuery};
use crate::constants::{DEFAULT_ABOVE_MA_WINDOW, DEFAULT_LONG_WINDOW, DEFAULT_SHORT_WINDOW};
use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::services::analysis::{ma_trend, moving_averages, stocks_above_ma, validate_limit, AboveMa, MaRow, MaTrend};
use crate::services::charts::moving_average_chart;
use crate::services::Figure;
use axum::extract::{Json, State};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Debug, Default, Deserialize)]
pub struct MovingAverageQuery {
    pub symbol: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Short window in days (default: 5)
    pub short: Option<usize>,
    /// Long window in days (default: 20)
    pub long: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MovingAverageResponse {
    pub symbol: String,
    pub short_window: usize,
    pub long_window: usize,
    pub trend: Option<MaTrend>,
    pub trend_message: Option<String>,
    pub rows: Vec<MaRow>,
    pub chart: Figure,
}

/// GET /analysis/moving-averages?symbol=TCS.NS&start_date=2024-01-01&short=5&long=20
#[instrument(skip(app_state))]
pub async fn moving_averages_handler(
    State(app_state): State<AppState>,
    Query(params): Query<MovingAverageQuery>,
) -> Result<Json<AnalysisResponse<MovingAverageResponse>>> {
    let short = params.short.unwrap_or(DEFAULT_SHORT_WINDOW);
    let long = params.long.unwrap_or(DEFAULT_LONG_WINDOW);
    if short == 0 || short >= long {
        return Err(AppError::InvalidInput(format!(
            "short window ({}) must be positive and less than long window ({})",
            short, long
        )));
    }

    let range_query = SymbolRangeQuery {
        symbol: params.symbol.clone(),
        start_date: params.start_date.clone(),
        end_date: params.end_date.clone(),
    };
    let (range, series) = load_symbol_range(&app_state, &range_query).await?;
    let symbol = range_query.symbol.trim().to_string();

    let rows = moving_averages(&series, short, long).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Not enough data for {}: {} rows, {}-day MA needs at least {}",
            symbol,
            series.len(),
            long,
            long
        ))
    })?;
    let trend = ma_trend(&rows);
    debug!("{} MA rows for {}, trend {:?}", rows.len(), symbol, trend);

    Ok(Json(AnalysisResponse::new(
        range.end,
        "moving_averages",
        series.len(),
        MovingAverageResponse {
            trend_message: trend.map(|t| t.message(short, long)),
            chart: moving_average_chart(&rows, &symbol, short, long),
            symbol,
            short_window: short,
            long_window: long,
            trend,
            rows,
        },
    )))
}

#[derive(Debug, Default, Deserialize)]
pub struct AboveMaQuery {
    pub date: Option<String>,
    /// MA window in days (default: 10)
    pub window: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AboveMaResponse {
    pub window: usize,
    pub stocks: Vec<AboveMa>,
}

/// GET /analysis/above-ma?date=2024-01-25&window=10&limit=10
#[instrument(skip(app_state))]
pub async fn above_ma_handler(
    State(app_state): State<AppState>,
    Query(params): Query<AboveMaQuery>,
) -> Result<Json<AnalysisResponse<AboveMaResponse>>> {
    let date = app_state.resolve_date(params.date.as_deref()).await?;
    let window = params.window.unwrap_or(DEFAULT_ABOVE_MA_WINDOW);
    if window == 0 {
        return Err(AppError::InvalidInput("window must be positive".to_string()));
    }

    let mut stocks = stocks_above_ma(&app_state.storage, date, window).await?;
    let total = stocks.len();
    stocks.truncate(validate_limit(params.limit));

    Ok(Json(AnalysisResponse::new(
        date,
        "above_ma",
        total,
        AboveMaResponse { window, stocks },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::test_support::state;

    fn ma_query(short: Option<usize>, long: Option<usize>) -> MovingAverageQuery {
        MovingAverageQuery {
            symbol: "TCS.NS".to_string(),
            start_date: Some("2024-01-01".to_string()),
            end_date: Some("2024-01-25".to_string()),
            short,
            long,
        }
    }

    #[tokio::test]
    async fn test_moving_averages_rising_series_is_bullish() {
        let (_dir, state) = state().await;
        let Json(response) = moving_averages_handler(State(state), Query(ma_query(None, None))).await.unwrap();
        let data = response.data;

        // 25 rows, 20-day window
        assert_eq!(data.rows.len(), 6);
        assert_eq!(data.rows[0].ma_long, 109.5);
        assert_eq!(data.trend, Some(MaTrend::Bullish));
        assert!(data.trend_message.unwrap().starts_with("🟢"));
        assert_eq!(data.chart.data.len(), 3);
    }

    #[tokio::test]
    async fn test_moving_averages_validation() {
        let (_dir, state) = state().await;
        let inverted = moving_averages_handler(State(state.clone()), Query(ma_query(Some(20), Some(5)))).await;
        assert!(matches!(inverted, Err(AppError::InvalidInput(_))));

        let too_long = moving_averages_handler(State(state.clone()), Query(ma_query(Some(5), Some(50)))).await;
        assert!(matches!(too_long, Err(AppError::InvalidInput(_))));

        let unknown = MovingAverageQuery {
            symbol: "NOPE.NS".to_string(),
            ..ma_query(None, None)
        };
        assert!(matches!(
            moving_averages_handler(State(state), Query(unknown)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_above_ma() {
        let (_dir, state) = state().await;
        let Json(response) = above_ma_handler(State(state), Query(AboveMaQuery::default())).await.unwrap();
        assert_eq!(response.analysis_date, "2024-01-25");
        assert_eq!(response.data.window, 10);
        let symbols: Vec<&str> = response.data.stocks.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["TCS.NS"]);
    }
}
