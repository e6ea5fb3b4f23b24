//! Closing price correlation endpoint

use super::AnalysisResponse;
use crate::constants::POPULAR_SYMBOLS;
use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::services::analysis::{correlation_matrix, CorrelationMatrix};
use crate::services::charts::correlation_heatmap;
use crate::services::Figure;
use axum::extract::{Json, State};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Debug, Default, Deserialize)]
pub struct CorrelationQuery {
    /// Symbols to correlate (repeatable); the popular symbols when absent
    pub symbol: Option<Vec<String>>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CorrelationResponse {
    pub matrix: CorrelationMatrix,
    pub chart: Figure,
}

/// GET /analysis/correlation?symbol=TCS.NS&symbol=INFY.NS&start_date=2024-01-01
#[instrument(skip(app_state))]
pub async fn correlation_handler(
    State(app_state): State<AppState>,
    Query(params): Query<CorrelationQuery>,
) -> Result<Json<AnalysisResponse<CorrelationResponse>>> {
    let symbols = match params.symbol.filter(|s| !s.is_empty()) {
        Some(symbols) => symbols,
        None => POPULAR_SYMBOLS.iter().map(|s| s.to_string()).collect(),
    };
    if symbols.len() < 2 {
        return Err(AppError::InvalidInput("Correlation needs at least two symbols".to_string()));
    }

    let range = app_state
        .resolve_range(params.start_date.as_deref(), params.end_date.as_deref())
        .await?;
    let series = app_state.storage.load_many(&symbols, &range).await?;
    let matrix = correlation_matrix(&series);

    Ok(Json(AnalysisResponse::new(
        range.end,
        "correlation",
        matrix.symbols.len(),
        CorrelationResponse {
            chart: correlation_heatmap(&matrix),
            matrix,
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::test_support::state;

    #[tokio::test]
    async fn test_opposite_trends_are_negatively_correlated() {
        let (_dir, state) = state().await;
        let params = CorrelationQuery {
            symbol: Some(vec!["TCS.NS".to_string(), "INFY.NS".to_string()]),
            start_date: Some("2024-01-01".to_string()),
            end_date: Some("2024-01-25".to_string()),
        };
        let Json(response) = correlation_handler(State(state), Query(params)).await.unwrap();
        let matrix = response.data.matrix;

        assert_eq!(matrix.symbols, vec!["INFY.NS", "TCS.NS"]);
        let r = matrix.values[0][1].unwrap();
        assert!((r + 1.0).abs() < 1e-9);
        assert_eq!(response.data.chart.data.len(), 1);
    }

    #[tokio::test]
    async fn test_single_symbol_is_rejected() {
        let (_dir, state) = state().await;
        let params = CorrelationQuery {
            symbol: Some(vec!["TCS.NS".to_string()]),
            ..Default::default()
        };
        assert!(matches!(
            correlation_handler(State(state), Query(params)).await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
