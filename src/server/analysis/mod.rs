//! Analysis API endpoints
//!
//! Each handler loads its inputs through [`Storage`](crate::services::Storage)
//! and wraps the result of a `services::analysis` function in
//! [`AnalysisResponse`].

pub mod correlation;
pub mod moving_average;
pub mod performers;
pub mod volume;

use crate::error::{AppError, Result};
use crate::models::{DateRange, StockPrice};
use crate::server::AppState;
use serde::{Deserialize, Serialize};

/// Re-export handlers for easier routing
pub use correlation::correlation_handler;
pub use moving_average::{above_ma_handler, moving_averages_handler};
pub use performers::{performers_handler, price_changes_handler};
pub use volume::{spikes_handler, volume_handler};

/// Common query parameters for date-based analysis endpoints
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisQuery {
    /// Date to analyze (YYYY-MM-DD format, default: latest stored date)
    pub date: Option<String>,

    /// Number of results to return (default: 10, max: 100)
    pub limit: Option<usize>,
}

/// Query parameters for single-symbol analysis over a range
#[derive(Debug, Default, Deserialize)]
pub struct SymbolRangeQuery {
    pub symbol: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Common analysis response structure
#[derive(Debug, Serialize)]
pub struct AnalysisResponse<T> {
    pub analysis_date: String,
    pub analysis_type: String,
    pub total_analyzed: usize,
    pub data: T,
}

impl<T> AnalysisResponse<T> {
    pub fn new(analysis_date: impl ToString, analysis_type: &str, total_analyzed: usize, data: T) -> Self {
        Self {
            analysis_date: analysis_date.to_string(),
            analysis_type: analysis_type.to_string(),
            total_analyzed,
            data,
        }
    }
}

/// Load one symbol over the requested range; a symbol with no rows is a 404
pub(crate) async fn load_symbol_range(
    app_state: &AppState,
    params: &SymbolRangeQuery,
) -> Result<(DateRange, Vec<StockPrice>)> {
    let symbol = params.symbol.trim();
    if symbol.is_empty() {
        return Err(AppError::InvalidInput("symbol is required".to_string()));
    }
    let range = app_state
        .resolve_range(params.start_date.as_deref(), params.end_date.as_deref())
        .await?;
    let series = app_state.storage.load_range(symbol, &range).await?;
    if series.is_empty() {
        return Err(AppError::NotFound(format!(
            "No data available for {} from {} to {}",
            symbol, range.start, range.end
        )));
    }
    Ok((range, series))
}
