//! Canned natural-language questions over stored data
//!
//! A question is lowercased and stripped of punctuation, classified into a
//! [`QueryIntent`] by keyword patterns, and answered with the analysis and
//! chart builders. Unanswerable questions produce [`QueryResult::Empty`]
//! with the reason in `explanation`; they are not errors.

mod extract;
mod intent;

pub use extract::Extractor;
pub use intent::{IntentMatcher, QueryIntent};

use crate::constants::{
    DEFAULT_ABOVE_MA_WINDOW, DEFAULT_LONG_WINDOW, DEFAULT_SHORT_WINDOW, MAX_COMPARE_SYMBOLS, POPULAR_SYMBOLS,
    SPIKE_THRESHOLD,
};
use crate::error::Result;
use crate::models::{DateRange, Direction, PerformanceMetric};
use crate::services::analysis::{
    analyze_volume, detect_spikes, market_summary, moving_averages, performance, price_changes_for_date,
    rank_performers, stocks_above_ma, symbol_summary, top_volume,
};
use crate::services::charts::{self, Figure};
use crate::services::Storage;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

const NO_SYMBOL: &str = "Could not identify any stock symbols in your query. Please specify a stock symbol.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum QueryResult {
    Table(Vec<Value>),
    Text(String),
    Empty,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub intent: QueryIntent,
    pub explanation: String,
    pub result: QueryResult,
    pub chart: Option<Figure>,
}

impl QueryResponse {
    fn answer(intent: QueryIntent, explanation: impl Into<String>, result: QueryResult, chart: Option<Figure>) -> Self {
        Self {
            intent,
            explanation: explanation.into(),
            result,
            chart,
        }
    }

    fn unanswered(intent: QueryIntent, reason: impl Into<String>) -> Self {
        Self::answer(intent, reason, QueryResult::Empty, None)
    }
}

fn table<T: Serialize>(rows: &[T]) -> Result<QueryResult> {
    let values = rows.iter().map(serde_json::to_value).collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(QueryResult::Table(values))
}

/// Parsed pieces of one question
struct ParsedQuery {
    text: String,
    intent: QueryIntent,
    range: DateRange,
    symbols: Vec<String>,
    limit: usize,
}

/// Compiled patterns for answering questions; build once and share
pub struct QueryAssistant {
    extractor: Extractor,
    matcher: IntentMatcher,
}

impl QueryAssistant {
    pub fn new() -> Result<Self> {
        Ok(Self {
            extractor: Extractor::new()?,
            matcher: IntentMatcher::new()?,
        })
    }

    pub fn identify_intent(&self, query: &str) -> QueryIntent {
        self.matcher.identify(&self.extractor.preprocess(query))
    }

    /// Answer `query` as of `context` (usually the latest stored date)
    #[instrument(skip(self, storage))]
    pub async fn process_query(&self, storage: &Storage, query: &str, context: NaiveDate) -> Result<QueryResponse> {
        let text = self.extractor.preprocess(query);
        let dates = storage.available_dates().await?;
        let available = storage.available_symbols(None).await?;

        let parsed = ParsedQuery {
            intent: self.matcher.identify(&text),
            range: self.extractor.extract_date_range(&text, context, &dates),
            symbols: self.extractor.extract_symbols(&text, &available),
            limit: self.extractor.extract_number(&text),
            text,
        };
        info!(
            "Query '{}' -> {} ({}, symbols {:?}, limit {})",
            parsed.text, parsed.intent, parsed.range, parsed.symbols, parsed.limit
        );

        match parsed.intent {
            QueryIntent::TopGainers => self.top_performers(storage, &parsed, Direction::Best).await,
            QueryIntent::TopLosers => self.top_performers(storage, &parsed, Direction::Worst).await,
            QueryIntent::PriceTrend => self.price_trend(storage, &parsed).await,
            QueryIntent::CompareStocks => self.compare(storage, parsed, &available).await,
            QueryIntent::MovingAverage => self.moving_average(storage, &parsed, context).await,
            QueryIntent::VolumeAnalysis => self.volume(storage, &parsed, context).await,
            QueryIntent::PriceSpike => self.spikes(storage, &parsed).await,
            QueryIntent::CurrentPrice => self.current_price(storage, &parsed, context).await,
            QueryIntent::GeneralInfo => self.general(storage, &parsed, context).await,
        }
    }

    async fn top_performers(&self, storage: &Storage, q: &ParsedQuery, direction: Direction) -> Result<QueryResponse> {
        let series = storage.load_all(&q.range).await?;
        let ranked = rank_performers(performance(&series), PerformanceMetric::Return, direction, q.limit);
        let word = match direction {
            Direction::Best => "gaining",
            Direction::Worst => "losing",
        };
        let explanation = format!("Showing the top {} {} stocks from {}", q.limit, word, q.range);

        let chart = (!ranked.is_empty()).then(|| {
            let values: Vec<(String, f64)> = ranked.iter().map(|p| (p.symbol.clone(), p.return_pct)).collect();
            charts::top_performers_chart(
                &values,
                PerformanceMetric::Return.label(),
                q.limit,
                direction == Direction::Worst,
            )
        });
        Ok(QueryResponse::answer(q.intent, explanation, table(&ranked)?, chart))
    }

    async fn price_trend(&self, storage: &Storage, q: &ParsedQuery) -> Result<QueryResponse> {
        let Some(symbol) = q.symbols.first() else {
            return Ok(QueryResponse::unanswered(q.intent, NO_SYMBOL));
        };
        let rows = storage.load_range(symbol, &q.range).await?;
        let chart = charts::price_chart(symbol, &rows, &q.range);
        Ok(QueryResponse::answer(
            q.intent,
            format!("Showing price trend for {} from {}", symbol, q.range),
            table(&rows)?,
            Some(chart),
        ))
    }

    async fn compare(&self, storage: &Storage, mut q: ParsedQuery, available: &[String]) -> Result<QueryResponse> {
        match q.symbols.len() {
            0 => {
                return Ok(QueryResponse::unanswered(
                    q.intent,
                    "Could not identify enough stock symbols to compare. Please specify at least two stock symbols.",
                ))
            }
            1 => {
                let first = q.symbols[0].clone();
                let extra: Vec<String> = POPULAR_SYMBOLS
                    .iter()
                    .filter(|s| **s != first && available.iter().any(|a| a == *s))
                    .take(2)
                    .map(|s| s.to_string())
                    .collect();
                debug!("Padding comparison of {} with {:?}", first, extra);
                q.symbols.extend(extra);
            }
            _ => {}
        }
        q.symbols.truncate(MAX_COMPARE_SYMBOLS);

        let series = storage.load_many(&q.symbols, &q.range).await?;
        let rows: Vec<_> = series.values().flatten().cloned().collect();
        let chart = charts::comparison_chart(&series, &q.range, true);
        Ok(QueryResponse::answer(
            q.intent,
            format!("Comparing performance of {} from {}", q.symbols.join(", "), q.range),
            table(&rows)?,
            Some(chart),
        ))
    }

    async fn moving_average(&self, storage: &Storage, q: &ParsedQuery, context: NaiveDate) -> Result<QueryResponse> {
        let Some(symbol) = q.symbols.first() else {
            if !(q.text.contains("above") || q.text.contains("over")) {
                return Ok(QueryResponse::unanswered(
                    q.intent,
                    "Could not identify any stock symbols in your query. Please specify a stock symbol for moving average analysis.",
                ));
            }

            let window = self.extractor.extract_window(&q.text).unwrap_or(DEFAULT_ABOVE_MA_WINDOW);
            let mut above = stocks_above_ma(storage, context, window).await?;
            if above.is_empty() {
                return Ok(QueryResponse::unanswered(
                    q.intent,
                    format!("Could not find stocks trading above their {}-day moving average.", window),
                ));
            }
            above.truncate(q.limit);

            let values: Vec<(String, f64)> = above.iter().map(|a| (a.symbol.clone(), a.difference_pct)).collect();
            let chart = charts::top_performers_chart(&values, "Difference (%)", q.limit, false);
            return Ok(QueryResponse::answer(
                q.intent,
                format!(
                    "Showing top {} stocks trading above their {}-day moving average as of {}",
                    q.limit, window, context
                ),
                table(&above)?,
                Some(chart),
            ));
        };

        let (short, long) = self
            .extractor
            .extract_ma_windows(&q.text, DEFAULT_SHORT_WINDOW, DEFAULT_LONG_WINDOW);
        let series = storage.load_range(symbol, &q.range).await?;
        let Some(rows) = moving_averages(&series, short, long) else {
            return Ok(QueryResponse::unanswered(
                q.intent,
                format!("Insufficient data to calculate moving averages for {}.", symbol),
            ));
        };

        let chart = charts::moving_average_chart(&rows, symbol, short, long);
        Ok(QueryResponse::answer(
            q.intent,
            format!(
                "Showing {}-day and {}-day moving averages for {} from {}",
                short, long, symbol, q.range
            ),
            table(&rows)?,
            Some(chart),
        ))
    }

    async fn volume(&self, storage: &Storage, q: &ParsedQuery, context: NaiveDate) -> Result<QueryResponse> {
        let Some(symbol) = q.symbols.first() else {
            let day = storage.load_day(context).await?;
            if day.is_empty() {
                return Ok(QueryResponse::unanswered(q.intent, format!("No data available for {}.", context)));
            }
            let top = top_volume(&day, q.limit);
            return Ok(QueryResponse::answer(
                q.intent,
                format!("Showing stocks with high trading volume as of {}", context),
                table(&top)?,
                None,
            ));
        };

        let series = storage.load_range(symbol, &q.range).await?;
        let Some(analysis) = analyze_volume(&series) else {
            return Ok(QueryResponse::unanswered(
                q.intent,
                format!("Insufficient data to analyze volume for {}.", symbol),
            ));
        };

        let chart = charts::volume_chart(&analysis, symbol);
        Ok(QueryResponse::answer(
            q.intent,
            format!("Showing volume analysis for {} from {}", symbol, q.range),
            table(&analysis.rows)?,
            Some(chart),
        ))
    }

    async fn spikes(&self, storage: &Storage, q: &ParsedQuery) -> Result<QueryResponse> {
        let Some(symbol) = q.symbols.first() else {
            return Ok(QueryResponse::unanswered(
                q.intent,
                "Could not identify any stock symbols in your query. Please specify a stock symbol for spike detection.",
            ));
        };

        let series = storage.load_range(symbol, &q.range).await?;
        match detect_spikes(&series, SPIKE_THRESHOLD) {
            Some(spikes) if !spikes.is_empty() => Ok(QueryResponse::answer(
                q.intent,
                format!("Showing detected price and volume spikes for {} from {}", symbol, q.range),
                table(&spikes)?,
                Some(charts::price_chart(symbol, &series, &q.range)),
            )),
            _ => Ok(QueryResponse::unanswered(
                q.intent,
                format!(
                    "No significant price or volume spikes detected for {} in the specified period.",
                    symbol
                ),
            )),
        }
    }

    async fn current_price(&self, storage: &Storage, q: &ParsedQuery, context: NaiveDate) -> Result<QueryResponse> {
        let Some(symbol) = q.symbols.first() else {
            return Ok(QueryResponse::unanswered(q.intent, NO_SYMBOL));
        };

        let day = storage.load_day(context).await?;
        if day.is_empty() {
            return Ok(QueryResponse::unanswered(q.intent, format!("No data available for {}.", context)));
        }
        let Some(row) = day.iter().find(|r| &r.symbol == symbol) else {
            return Ok(QueryResponse::unanswered(
                q.intent,
                format!("No data available for {} on {}.", symbol, context),
            ));
        };

        Ok(QueryResponse::answer(
            q.intent,
            format!("Showing current price for {}", symbol),
            QueryResult::Text(format!(
                "The latest price of {} as of {} is ₹{:.2}",
                symbol, context, row.close
            )),
            None,
        ))
    }

    async fn general(&self, storage: &Storage, q: &ParsedQuery, context: NaiveDate) -> Result<QueryResponse> {
        if let Some(symbol) = q.symbols.first() {
            let series = storage.load_range(symbol, &q.range).await?;
            let Some(summary) = symbol_summary(symbol, &series) else {
                return Ok(QueryResponse::unanswered(
                    q.intent,
                    format!("No data available for {} from {}.", symbol, q.range),
                ));
            };
            return Ok(QueryResponse::answer(
                q.intent,
                format!("Showing general information for {} from {}", symbol, q.range),
                QueryResult::Text(summary.describe()),
                Some(charts::price_chart(symbol, &series, &q.range)),
            ));
        }

        let (_, changes) = price_changes_for_date(storage, context).await?;
        match market_summary(&changes) {
            Some(summary) => Ok(QueryResponse::answer(
                q.intent,
                format!("Market summary for {}", context),
                QueryResult::Text(summary.describe()),
                None,
            )),
            None => Ok(QueryResponse::unanswered(q.intent, format!("No data available for {}.", context))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StockPrice;
    use chrono::Duration;
    use tempfile::tempdir;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// 30 daily rows per symbol ending 2024-01-30
    fn rows(symbol: &str, base: f64, step: f64) -> Vec<StockPrice> {
        (0..30)
            .map(|i| {
                let close = base + step * i as f64;
                let volume = if i == 25 { 90_000 } else { 1_000 + i as u64 };
                StockPrice::new(symbol, d("2024-01-01") + Duration::days(i), close, close + 1.0, close - 1.0, close, volume)
            })
            .collect()
    }

    async fn storage(dir: &std::path::Path) -> Storage {
        let storage = Storage::csv_only(dir.join("csv"));
        storage.save(&rows("TCS.NS", 100.0, 1.0)).await.unwrap();
        storage.save(&rows("INFY.NS", 200.0, -1.0)).await.unwrap();
        storage.save(&rows("RELIANCE.NS", 50.0, 0.2)).await.unwrap();
        storage
    }

    async fn ask(q: &str) -> QueryResponse {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        QueryAssistant::new().unwrap().process_query(&storage, q, d("2024-01-30")).await.unwrap()
    }

    #[test]
    fn test_identify_intent_preprocesses() {
        let assistant = QueryAssistant::new().unwrap();
        assert_eq!(assistant.identify_intent("Which stocks GAINED the most?!"), QueryIntent::TopGainers);
        assert_eq!(assistant.identify_intent("TCS vs. INFY"), QueryIntent::CompareStocks);
    }

    #[tokio::test]
    async fn test_top_gainers() {
        let resp = ask("Top 2 gainers this week").await;
        assert_eq!(resp.intent, QueryIntent::TopGainers);
        let QueryResult::Table(rows) = resp.result else { panic!("expected table") };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["symbol"], "TCS.NS");
        assert_eq!(resp.chart.unwrap().title(), Some("Top 2 Stocks by Return (%)"));
    }

    #[tokio::test]
    async fn test_current_price() {
        let resp = ask("What is the latest price of TCS?").await;
        assert_eq!(resp.intent, QueryIntent::CurrentPrice);
        assert_eq!(
            resp.result,
            QueryResult::Text("The latest price of TCS.NS as of 2024-01-30 is ₹129.00".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_symbol_is_explained() {
        let resp = ask("latest price please").await;
        assert_eq!(resp.result, QueryResult::Empty);
        assert_eq!(resp.explanation, NO_SYMBOL);
    }

    #[tokio::test]
    async fn test_compare_pads_with_popular_symbols() {
        let resp = ask("compare infy").await;
        assert_eq!(resp.intent, QueryIntent::CompareStocks);
        assert!(resp.explanation.starts_with("Comparing performance of INFY.NS, RELIANCE.NS, TCS.NS"));
        assert!(resp.chart.is_some());
    }

    #[tokio::test]
    async fn test_moving_average_for_symbol() {
        let resp = ask("tcs ma over 30 days").await;
        assert_eq!(resp.intent, QueryIntent::MovingAverage);
        let QueryResult::Table(rows) = resp.result else { panic!("expected table") };
        // 30 rows in range, the first full 20-day window ends at the 20th
        assert_eq!(rows.len(), 11);
    }

    #[tokio::test]
    async fn test_stocks_above_ma() {
        let resp = ask("stocks above 10-day moving average").await;
        assert_eq!(resp.intent, QueryIntent::MovingAverage);
        let QueryResult::Table(rows) = resp.result else { panic!("expected table") };
        let symbols: Vec<&str> = rows.iter().filter_map(|r| r["symbol"].as_str()).collect();
        assert_eq!(symbols, vec!["TCS.NS", "RELIANCE.NS"]);
    }

    #[tokio::test]
    async fn test_spikes() {
        let resp = ask("any volume spike in reliance in last 10 days").await;
        assert_eq!(resp.intent, QueryIntent::VolumeAnalysis);

        let resp = ask("any spike in reliance in last 10 days").await;
        assert_eq!(resp.intent, QueryIntent::PriceSpike);
        let QueryResult::Table(rows) = resp.result else { panic!("expected table") };
        assert_eq!(rows[0]["date"], "2024-01-26");
    }

    #[tokio::test]
    async fn test_general_market_summary() {
        let resp = ask("how is the market doing").await;
        assert_eq!(resp.intent, QueryIntent::GeneralInfo);
        let QueryResult::Text(text) = resp.result else { panic!("expected text") };
        assert!(text.starts_with("3 stocks tracked: 2 up, 1 down"));
    }
}
