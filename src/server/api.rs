use crate::constants::DEFAULT_FETCH_DAYS;
use crate::error::{AppError, Result};
use crate::models::{DateRange, StockPrice};
use crate::server::{AppState, SharedHealthStats};
use crate::services::{
    get_market_stats, ClearSummary, DataSync, MigrationReport, QueryResponse, SharedStorage, SyncReport,
};
use crate::utils::{get_public_dir, parse_date, parse_optional_date, today};
use axum::{
    extract::{Json, Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::Query;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// GET /health
#[instrument(skip(app_state, health_state))]
pub async fn health_handler(
    State(app_state): State<AppState>,
    State(health_state): State<SharedHealthStats>,
) -> Result<Json<Value>> {
    let health = health_state.read().await.clone();
    let stats = get_market_stats(&app_state.storage, &app_state.universe).await?;
    let dates = app_state.storage.available_dates().await?;

    Ok(Json(json!({
        "status": "ok",
        "uptime_secs": health.started.elapsed().as_secs(),
        "current_system_time": Utc::now().to_rfc3339(),
        "first_date": dates.first(),
        "last_date": dates.last(),
        "date_count": dates.len(),
        "stats": stats,
        "server": health,
    })))
}

/// GET /dates
#[instrument(skip(storage))]
pub async fn dates_handler(State(storage): State<SharedStorage>) -> Result<Json<Value>> {
    let dates = storage.available_dates().await?;
    Ok(Json(json!({ "count": dates.len(), "dates": dates })))
}

#[derive(Debug, Deserialize)]
pub struct SymbolsQuery {
    /// Only symbols stored for this date (YYYY-MM-DD)
    pub date: Option<String>,
}

/// GET /symbols?date=2024-01-05
#[instrument(skip(storage))]
pub async fn symbols_handler(
    State(storage): State<SharedStorage>,
    Query(params): Query<SymbolsQuery>,
) -> Result<Json<Value>> {
    let date = parse_optional_date(params.date.as_deref())?;
    let symbols = storage.available_symbols(date).await?;
    Ok(Json(json!({ "date": date, "count": symbols.len(), "symbols": symbols })))
}

#[derive(Debug, Default, Deserialize)]
pub struct UniverseQuery {
    /// Only this sector group
    pub group: Option<String>,
}

/// GET /universe - sector groups of the configured universe
///
/// `/universe?group=IT` returns one group's symbols.
#[instrument(skip(app_state))]
pub async fn universe_handler(
    State(app_state): State<AppState>,
    Query(params): Query<UniverseQuery>,
) -> Result<Json<Value>> {
    let universe = &app_state.universe;

    if let Some(group) = params.group {
        let symbols = universe
            .get_group(&group.to_uppercase())
            .ok_or_else(|| AppError::NotFound(format!("Unknown group '{}'", group)))?;
        return Ok(Json(json!({ "group": group.to_uppercase(), "symbols": symbols })));
    }

    info!(groups = universe.groups.len(), symbols = universe.symbol_count(), "Returning universe");
    Ok(Json(json!({
        "symbol_count": universe.symbol_count(),
        "group_names": universe.group_names(),
        "groups": universe.groups,
    })))
}

/// Query parameters for /prices
#[derive(Debug, Deserialize)]
pub struct PricesQuery {
    /// Symbols to load (can be repeated: symbol=TCS.NS&symbol=INFY.NS)
    pub symbol: Option<Vec<String>>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Response format: json (default) or csv
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "json".to_string()
}

/// GET /prices - stored daily rows
///
/// Examples:
/// - /prices?symbol=TCS.NS (last 30 days up to the latest stored date)
/// - /prices?symbol=TCS.NS&symbol=INFY.NS&start_date=2024-01-01&end_date=2024-03-31
/// - /prices?symbol=TCS.NS&format=csv
#[instrument(skip(app_state))]
pub async fn prices_handler(State(app_state): State<AppState>, Query(params): Query<PricesQuery>) -> Result<Response> {
    let symbols = params.symbol.unwrap_or_default();
    if symbols.is_empty() {
        return Err(AppError::InvalidInput("At least one symbol is required".to_string()));
    }
    let range = app_state
        .resolve_range(params.start_date.as_deref(), params.end_date.as_deref())
        .await?;

    let data = app_state.storage.load_many(&symbols, &range).await?;
    debug!("Loaded {} symbols for {}", data.len(), range);

    if params.format == "csv" {
        let rows: Vec<StockPrice> = data.into_values().flatten().collect();
        return csv_response(&rows, &format!("prices_{}_{}.csv", range.start, range.end));
    }

    Ok(Json(json!({
        "start_date": range.start,
        "end_date": range.end,
        "data": data,
    }))
    .into_response())
}

fn csv_response(rows: &[StockPrice], filename: &str) -> Result<Response> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let body = writer
        .into_inner()
        .map_err(|e| AppError::Io(format!("CSV buffer error: {}", e)))?;

    info!("CSV response: {} records, {} bytes", rows.len(), body.len());
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        body,
    )
        .into_response())
}

/// GET /day/{date} - every stored symbol for one date
#[instrument(skip(storage))]
pub async fn day_handler(State(storage): State<SharedStorage>, Path(date): Path<String>) -> Result<Json<Value>> {
    let date = parse_date(&date)?;
    let rows = storage.load_day(date).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound(format!("No data available for {}.", date)));
    }
    Ok(Json(json!({ "date": date, "count": rows.len(), "rows": rows })))
}

/// DELETE /day/{date}
#[instrument(skip(storage))]
pub async fn clear_day_handler(
    State(storage): State<SharedStorage>,
    Path(date): Path<String>,
) -> Result<Json<ClearSummary>> {
    let date = parse_date(&date)?;
    let summary = storage.clear_date(date).await?;
    info!("Cleared {}: {} db rows, {} csv files", date, summary.db_rows, summary.csv_files);
    Ok(Json(summary))
}

/// Body of POST /fetch; everything optional
#[derive(Debug, Default, Deserialize)]
pub struct FetchRequest {
    pub symbols: Option<Vec<String>>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub days: Option<i64>,
}

impl FetchRequest {
    /// Requested range; defaults to the last `days` (30) days ending today
    pub fn range(&self) -> Result<DateRange> {
        let end = parse_optional_date(self.end_date.as_deref())?.unwrap_or_else(today);
        let start = match parse_optional_date(self.start_date.as_deref())? {
            Some(start) => start,
            None => DateRange::days_before(end, self.days.unwrap_or(DEFAULT_FETCH_DAYS))?,
        };
        DateRange::new(start, end)
    }
}

/// POST /fetch - download from the market-data API and store
#[instrument(skip(app_state))]
pub async fn fetch_handler(
    State(app_state): State<AppState>,
    Json(request): Json<FetchRequest>,
) -> Result<Json<SyncReport>> {
    let range = request.range()?;
    let symbols = match request.symbols.filter(|s| !s.is_empty()) {
        Some(symbols) => symbols,
        None => app_state.universe.all_symbols(),
    };

    let sync = DataSync::new(&app_state.client, &app_state.storage);
    let report = sync
        .run(&symbols, &range, |done, total, symbol| debug!("Fetched {}/{} {}", done, total, symbol))
        .await?;

    let mut health = app_state.health.write().await;
    health.fetch_runs += 1;
    health.last_fetch = Some(Utc::now().to_rfc3339());

    Ok(Json(report))
}

/// POST /migrate - copy every CSV date into the database
#[instrument(skip(app_state))]
pub async fn migrate_handler(State(app_state): State<AppState>) -> Result<Json<MigrationReport>> {
    let report = app_state.storage.migrate_csv_to_db(|_, _| {}).await?;
    app_state.health.write().await.last_migration = Some(Utc::now().to_rfc3339());
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    pub symbol: String,
    /// ma_5, ma_20, return_pct, volume_change_pct or volume_ma_5; all when absent
    pub indicator: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// GET /metrics?symbol=TCS.NS&indicator=ma_20
#[instrument(skip(app_state))]
pub async fn metrics_handler(
    State(app_state): State<AppState>,
    Query(params): Query<MetricsQuery>,
) -> Result<Json<Value>> {
    let range = app_state
        .resolve_range(params.start_date.as_deref(), params.end_date.as_deref())
        .await?;
    let metrics = app_state
        .storage
        .load_metrics(&params.symbol, params.indicator.as_deref(), &range)
        .await?;

    let mut by_indicator: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for m in &metrics {
        by_indicator
            .entry(m.indicator.clone())
            .or_default()
            .push(json!({ "date": m.date, "value": m.value }));
    }

    Ok(Json(json!({
        "symbol": params.symbol,
        "start_date": range.start,
        "end_date": range.end,
        "count": metrics.len(),
        "indicators": by_indicator,
    })))
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Date the question is asked "as of"; latest stored date by default
    pub context_date: Option<String>,
}

/// POST /query - answer a natural-language question
#[instrument(skip(app_state))]
pub async fn query_handler(
    State(app_state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    if request.query.trim().is_empty() {
        return Err(AppError::InvalidInput("Query must not be empty".to_string()));
    }
    let context = match parse_optional_date(request.context_date.as_deref())? {
        Some(date) => date,
        None => app_state.storage.latest_date().await?.unwrap_or_else(today),
    };

    let response = app_state
        .assistant
        .process_query(&app_state.storage, &request.query, context)
        .await?;
    Ok(Json(response))
}

/// GET / - the dashboard page
#[instrument]
pub async fn index_handler() -> impl IntoResponse {
    let index_path = get_public_dir().join("index.html");

    match tokio::fs::read_to_string(&index_path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            warn!(error = %e, path = %index_path.display(), "Failed to read index.html");
            (
                StatusCode::NOT_FOUND,
                Html("<h1>Dashboard not found</h1><p>Set PUBLIC_DIR to the directory holding index.html.</p>"),
            )
                .into_response()
        }
    }
}
