pub mod analysis;
pub mod api;
pub mod charts;

use crate::constants::DEFAULT_ANALYSIS_DAYS;
use crate::error::{AppError, Result};
use crate::models::{DateRange, Universe};
use crate::services::{QueryAssistant, SharedStorage, Storage, YahooClient};
use crate::utils::{get_public_dir, parse_optional_date, today};
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// Counters updated by handlers and reported by `/health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthStats {
    pub started_at: String,
    #[serde(skip)]
    pub started: Instant,
    pub fetch_runs: u64,
    pub last_fetch: Option<String>,
    pub last_migration: Option<String>,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now().to_rfc3339(),
            started: Instant::now(),
            fetch_runs: 0,
            last_fetch: None,
            last_migration: None,
        }
    }
}

pub type SharedHealthStats = Arc<RwLock<HealthStats>>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: SharedStorage,
    pub universe: Arc<Universe>,
    pub health: SharedHealthStats,
    pub assistant: Arc<QueryAssistant>,
    pub client: Arc<YahooClient>,
}

impl AppState {
    pub fn new(storage: Storage, universe: Universe, client: YahooClient) -> Result<Self> {
        Ok(Self {
            storage: Arc::new(storage),
            universe: Arc::new(universe),
            health: Arc::new(RwLock::new(HealthStats::default())),
            assistant: Arc::new(QueryAssistant::new()?),
            client: Arc::new(client),
        })
    }

    /// `date` if given, else the latest stored date
    pub async fn resolve_date(&self, date: Option<&str>) -> Result<NaiveDate> {
        match parse_optional_date(date)? {
            Some(date) => Ok(date),
            None => self
                .storage
                .latest_date()
                .await?
                .ok_or_else(|| AppError::NotFound("No data available".to_string())),
        }
    }

    /// Range from optional bounds; defaults to the 30 days ending at the
    /// latest stored date (today when nothing is stored)
    pub async fn resolve_range(&self, start: Option<&str>, end: Option<&str>) -> Result<DateRange> {
        let default_end = self.storage.latest_date().await?.unwrap_or_else(today);
        DateRange::resolve(
            parse_optional_date(start)?,
            parse_optional_date(end)?,
            default_end,
            DEFAULT_ANALYSIS_DAYS,
        )
    }
}

impl FromRef<AppState> for SharedStorage {
    fn from_ref(app_state: &AppState) -> SharedStorage {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for SharedHealthStats {
    fn from_ref(app_state: &AppState) -> SharedHealthStats {
        app_state.health.clone()
    }
}

/// All routes, without CORS or the listener
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(api::index_handler))
        .route("/health", get(api::health_handler))
        .route("/dates", get(api::dates_handler))
        .route("/symbols", get(api::symbols_handler))
        .route("/universe", get(api::universe_handler))
        .route("/prices", get(api::prices_handler))
        .route("/day/{date}", get(api::day_handler).delete(api::clear_day_handler))
        .route("/fetch", post(api::fetch_handler))
        .route("/migrate", post(api::migrate_handler))
        .route("/metrics", get(api::metrics_handler))
        .route("/query", post(api::query_handler))
        .route("/analysis/price-changes", get(analysis::price_changes_handler))
        .route("/analysis/moving-averages", get(analysis::moving_averages_handler))
        .route("/analysis/volume", get(analysis::volume_handler))
        .route("/analysis/spikes", get(analysis::spikes_handler))
        .route("/analysis/performers", get(analysis::performers_handler))
        .route("/analysis/above-ma", get(analysis::above_ma_handler))
        .route("/analysis/correlation", get(analysis::correlation_handler))
        .route("/charts/price", get(charts::price_chart_handler))
        .route("/charts/comparison", get(charts::comparison_chart_handler))
        .with_state(app_state)
}

/// Start the axum server
pub async fn serve(app_state: AppState, port: u16) -> Result<()> {
    tracing::info!("Starting niftydash server ({} backend)", app_state.storage.backend());

    match app_state.storage.auto_migrate().await {
        Ok(Some(report)) => tracing::info!(
            "Migrated {} records from {} CSV dates into the database",
            report.records,
            report.dates
        ),
        Ok(None) => {}
        Err(e) => tracing::warn!("Startup migration skipped: {}", e),
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers(Any);

    let public_dir = get_public_dir();
    tracing::info!("Using public directory: {}", public_dir.display());

    tracing::info!("Registering routes:");
    tracing::info!("  GET  / (dashboard)");
    tracing::info!("  GET  /prices?symbol=TCS.NS&start_date=2024-01-01&end_date=2024-01-31");
    tracing::info!("  GET  /analysis/* and /charts/*");
    tracing::info!("  POST /fetch, /migrate, /query");
    tracing::info!("  GET  /public/* (static files from {})", public_dir.display());

    let app = router(app_state)
        .nest_service("/public", ServeDir::new(public_dir))
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;

    #[tokio::test]
    async fn test_resolve_defaults_to_latest_date() {
        let (_dir, state) = state().await;
        assert_eq!(state.resolve_date(None).await.unwrap(), d("2024-01-25"));
        assert_eq!(state.resolve_date(Some("2024-01-10")).await.unwrap(), d("2024-01-10"));
        assert!(state.resolve_date(Some("10/01/2024")).await.is_err());

        let range = state.resolve_range(None, None).await.unwrap();
        assert_eq!(range.end, d("2024-01-25"));
        assert_eq!(range.start, d("2023-12-26"));
        assert!(state.resolve_range(Some("2024-02-01"), Some("2024-01-01")).await.is_err());
    }
}
