use crate::constants::DATE_FORMAT;
use crate::error::{AppError, Result};
use chrono::{Local, NaiveDate};
use std::path::PathBuf;

/// Get CSV data directory from environment variable or use default
pub fn get_data_dir() -> PathBuf {
    std::env::var("DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Get SQLite database path from `DATABASE_URL`
///
/// Returns `None` when the database is disabled (`DATABASE_URL=none`).
pub fn get_database_path() -> Option<PathBuf> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => parse_database_url(&url),
        Err(_) => Some(get_data_dir().join("stocks.db")),
    }
}

fn parse_database_url(url: &str) -> Option<PathBuf> {
    let url = url.trim();
    if url.is_empty() || url.eq_ignore_ascii_case("none") {
        return None;
    }
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    Some(PathBuf::from(path))
}

/// Get static asset directory for the dashboard
pub fn get_public_dir() -> PathBuf {
    std::env::var("PUBLIC_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("public"))
}

/// Get universe (sector → symbols) JSON file path
pub fn get_universe_file() -> PathBuf {
    std::env::var("UNIVERSE_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("nifty50.json"))
}

/// Get market data API base URL
pub fn get_yahoo_base_url() -> String {
    std::env::var("YAHOO_BASE_URL").unwrap_or_else(|_| "https://query1.finance.yahoo.com".to_string())
}

/// Get server port from `PORT` or use default
pub fn get_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000)
}

/// Install the fmt subscriber with `RUST_LOG` or the given default filter
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .try_init();
}

/// Parse a YYYY-MM-DD date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| AppError::InvalidInput(format!("Invalid date '{}', expected YYYY-MM-DD", value)))
}

/// Parse an optional YYYY-MM-DD date
pub fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    value.filter(|v| !v.trim().is_empty()).map(parse_date).transpose()
}

/// Format date as YYYY-MM-DD
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Today in the local timezone
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Latest available date strictly before `reference`
pub fn previous_trading_day(dates: &[NaiveDate], reference: NaiveDate) -> Option<NaiveDate> {
    dates.iter().copied().filter(|d| *d < reference).max()
}

/// Strip the exchange suffix (`RELIANCE.NS` → `RELIANCE`)
pub fn base_symbol(symbol: &str) -> &str {
    symbol.split('.').next().unwrap_or(symbol)
}

/// Symbol as used in file names (`.`, `:` and `/` become `_`)
pub fn file_symbol(symbol: &str) -> String {
    symbol.replace(['.', ':', '/'], "_")
}

/// Best-effort inverse of [`file_symbol`] for the common `NAME_NS` case
pub fn symbol_from_file_stem(stem: &str) -> String {
    match stem.rsplit_once('_') {
        Some((name, suffix)) if !name.is_empty() && suffix.chars().all(|c| c.is_ascii_uppercase()) => {
            format!("{}.{}", name, suffix)
        }
        _ => stem.to_string(),
    }
}

/// Rupee amount in Indian units: crore above 1e7, lakh above 1e5
pub fn format_currency(value: f64) -> String {
    if value.abs() >= 10_000_000.0 {
        format!("₹{:.2} Cr", value / 10_000_000.0)
    } else if value.abs() >= 100_000.0 {
        format!("₹{:.2} L", value / 100_000.0)
    } else {
        format!("₹{:.2}", value)
    }
}

/// Thousands separators for counts
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}
