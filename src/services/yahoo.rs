//! Client for the Yahoo Finance chart API
//!
//! One request per symbol: `GET /v8/finance/chart/{symbol}` with a unix
//! `period1`/`period2` window and `interval=1d`. Responses carry parallel
//! arrays (`timestamp`, `indicators.quote[0].open/high/low/close/volume`)
//! which are zipped into [`StockPrice`] rows.

use crate::constants::FETCH_DELAY_MS;
use crate::error::{AppError, Result};
use crate::models::{sort_and_dedup_by_date, DateRange, StockPrice};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use rand::seq::SliceRandom;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration as StdDuration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// A symbol that could not be fetched in a batch
#[derive(Debug, Clone, Serialize)]
pub struct FetchFailure {
    pub symbol: String,
    pub error: String,
}

/// Result of fetching several symbols one after another
#[derive(Debug, Default)]
pub struct FetchBatch {
    pub data: BTreeMap<String, Vec<StockPrice>>,
    pub failures: Vec<FetchFailure>,
}

pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
    request_delay: StdDuration,
}

impl YahooClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. "https://query1.finance.yahoo.com"
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Invalid base_url: must start with http:// or https://, got: '{}'",
                base_url
            )));
        }

        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);

        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created YahooClient: base_url='{}'", base_url);

        Ok(Self {
            base_url,
            client,
            request_delay: StdDuration::from_millis(FETCH_DELAY_MS),
        })
    }

    /// Override the pause between batch requests
    pub fn with_request_delay(mut self, delay: StdDuration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Daily bars for `symbol` over `range` (both ends inclusive)
    pub async fn fetch_history(&self, symbol: &str, range: &DateRange) -> Result<Vec<StockPrice>> {
        let period1 = unix_midnight(range.start);
        // period2 is exclusive on the API side
        let period2 = unix_midnight(range.end + Duration::days(1));
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        debug!("Fetching {} from {} ({})", symbol, url, range);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::Network(format!("Request for {} failed: {}", symbol, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimit);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("symbol not found: {}", symbol)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Network(format!(
                "API returned error status {} for {}: {}",
                status, symbol, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read response body: {}", e)))?;
        let json: Value = serde_json::from_str(&body)
            .map_err(|e| AppError::Parse(format!("Failed to parse JSON response: {}", e)))?;

        let rows = parse_chart_response(symbol, &json)?;
        info!("Fetched {} rows for {} ({})", rows.len(), symbol, range);
        Ok(rows)
    }

    /// Fetch several symbols sequentially with a pause between requests
    ///
    /// Failures are collected, not propagated. `on_progress(done, total, symbol)`
    /// runs after each symbol.
    pub async fn fetch_many<F>(&self, symbols: &[String], range: &DateRange, mut on_progress: F) -> FetchBatch
    where
        F: FnMut(usize, usize, &str),
    {
        let mut batch = FetchBatch::default();
        let total = symbols.len();

        for (i, symbol) in symbols.iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                sleep(self.request_delay).await;
            }

            match self.fetch_history(symbol, range).await {
                Ok(rows) => {
                    batch.data.insert(symbol.clone(), rows);
                }
                Err(e) => {
                    warn!("Failed to fetch {}: {}", symbol, e);
                    batch.failures.push(FetchFailure {
                        symbol: symbol.clone(),
                        error: e.to_string(),
                    });
                }
            }

            on_progress(i + 1, total, symbol);
        }

        info!(
            "Batch fetch finished: {} ok, {} failed",
            batch.data.len(),
            batch.failures.len()
        );
        batch
    }
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Convert a chart API response into rows sorted by date
///
/// Rows without a close are skipped; missing open/high/low fall back to the
/// close and missing volume to zero. A later row for the same date replaces
/// an earlier one.
pub fn parse_chart_response(symbol: &str, json: &Value) -> Result<Vec<StockPrice>> {
    let chart = json
        .get("chart")
        .ok_or_else(|| AppError::Parse("Missing 'chart' field".to_string()))?;

    if let Some(err) = chart.get("error").filter(|e| !e.is_null()) {
        let description = err["description"]
            .as_str()
            .or_else(|| err["code"].as_str())
            .unwrap_or("unknown error");
        return Err(AppError::NotFound(format!("{}: {}", symbol, description)));
    }

    let result = chart["result"]
        .get(0)
        .ok_or_else(|| AppError::NotFound(format!("No data found for {}", symbol)))?;

    let offset_secs = result["meta"]["gmtoffset"].as_i64().unwrap_or(0) as i32;
    let offset = FixedOffset::east_opt(offset_secs)
        .ok_or_else(|| AppError::Parse(format!("Invalid gmtoffset {}", offset_secs)))?;

    let timestamps = match result["timestamp"].as_array() {
        Some(ts) => ts,
        None => return Err(AppError::NotFound(format!("No data found for {}", symbol))),
    };
    let quote = &result["indicators"]["quote"][0];
    let field = |name: &str, i: usize| quote[name].get(i).and_then(Value::as_f64);

    let mut rows = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(ts) = ts.as_i64() else { continue };
        let Some(close) = field("close", i) else { continue };
        let date = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| AppError::Parse(format!("Invalid timestamp {}", ts)))?
            .with_timezone(&offset)
            .date_naive();

        let open = field("open", i).unwrap_or(close);
        let high = field("high", i).unwrap_or(close);
        let low = field("low", i).unwrap_or(close);
        let volume = field("volume", i).map(|v| v.max(0.0) as u64).unwrap_or(0);

        rows.push(StockPrice::new(symbol, date, open, high, low, close, volume));
    }

    if rows.is_empty() {
        return Err(AppError::NotFound(format!("No data found for {}", symbol)));
    }

    sort_and_dedup_by_date(&mut rows);
    Ok(rows)
}
