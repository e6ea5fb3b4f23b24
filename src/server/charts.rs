//! Plotly figure endpoints for the dashboard

use crate::constants::MAX_COMPARE_SYMBOLS;
use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::services::charts::{comparison_chart, price_chart};
use crate::services::Figure;
use axum::extract::{Json, State};
use axum_extra::extract::Query;
use serde::Deserialize;
use tracing::instrument;

#[derive(Debug, Default, Deserialize)]
pub struct PriceChartQuery {
    pub symbol: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// GET /charts/price?symbol=TCS.NS&start_date=2024-01-01&end_date=2024-01-31
///
/// A symbol without rows in the range yields an empty figure, not an error.
#[instrument(skip(app_state))]
pub async fn price_chart_handler(
    State(app_state): State<AppState>,
    Query(params): Query<PriceChartQuery>,
) -> Result<Json<Figure>> {
    let range = app_state
        .resolve_range(params.start_date.as_deref(), params.end_date.as_deref())
        .await?;
    let rows = app_state.storage.load_range(&params.symbol, &range).await?;
    Ok(Json(price_chart(&params.symbol, &rows, &range)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ComparisonChartQuery {
    /// Repeatable: symbol=TCS.NS&symbol=INFY.NS
    pub symbol: Option<Vec<String>>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Plot percent change from each first close
    #[serde(default)]
    pub normalize: bool,
}

/// GET /charts/comparison?symbol=TCS.NS&symbol=INFY.NS&normalize=true
#[instrument(skip(app_state))]
pub async fn comparison_chart_handler(
    State(app_state): State<AppState>,
    Query(params): Query<ComparisonChartQuery>,
) -> Result<Json<Figure>> {
    let symbols = params.symbol.unwrap_or_default();
    if symbols.is_empty() || symbols.len() > MAX_COMPARE_SYMBOLS {
        return Err(AppError::InvalidInput(format!(
            "Select between 1 and {} symbols to compare",
            MAX_COMPARE_SYMBOLS
        )));
    }

    let range = app_state
        .resolve_range(params.start_date.as_deref(), params.end_date.as_deref())
        .await?;
    let series = app_state.storage.load_many(&symbols, &range).await?;
    Ok(Json(comparison_chart(&series, &range, params.normalize)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::test_support::state;

    #[tokio::test]
    async fn test_price_chart() {
        let (_dir, state) = state().await;
        let params = PriceChartQuery {
            symbol: "TCS.NS".to_string(),
            start_date: Some("2024-01-01".to_string()),
            end_date: Some("2024-01-10".to_string()),
        };
        let Json(figure) = price_chart_handler(State(state.clone()), Query(params)).await.unwrap();
        assert_eq!(figure.data.len(), 2);
        assert_eq!(figure.data[0]["type"], "candlestick");

        let missing = PriceChartQuery {
            symbol: "NOPE.NS".to_string(),
            ..Default::default()
        };
        let Json(figure) = price_chart_handler(State(state), Query(missing)).await.unwrap();
        assert!(figure.is_empty());
    }

    #[tokio::test]
    async fn test_comparison_chart_limits() {
        let (_dir, state) = state().await;
        let params = ComparisonChartQuery {
            symbol: Some(vec!["TCS.NS".to_string(), "INFY.NS".to_string()]),
            normalize: true,
            ..Default::default()
        };
        let Json(figure) = comparison_chart_handler(State(state.clone()), Query(params)).await.unwrap();
        assert_eq!(figure.data.len(), 2);

        let too_many = ComparisonChartQuery {
            symbol: Some((0..6).map(|i| format!("S{}.NS", i)).collect()),
            ..Default::default()
        };
        assert!(comparison_chart_handler(State(state.clone()), Query(too_many)).await.is_err());
        assert!(comparison_chart_handler(State(state), Query(ComparisonChartQuery::default()))
            .await
            .is_err());
    }
}
