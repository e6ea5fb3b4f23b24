//! Shared constants
//!
//! ## CSV Layout
//!
//! One file per symbol per trading date:
//! `{DATA_DIR}/{YYYY-MM-DD}/{FILE_SYMBOL}.csv` with the 7 columns listed in
//! [`csv_column`]. The `symbol` column is authoritative; the file name only
//! exists so a day directory can be listed without opening every file.

/// Header row written to every CSV file
pub const CSV_HEADER: [&str; 7] = ["symbol", "date", "open", "high", "low", "close", "volume"];

/// Column indices for the CSV format (0-indexed)
pub mod csv_column {
    pub const SYMBOL: usize = 0;
    pub const DATE: usize = 1;
    pub const OPEN: usize = 2;
    pub const HIGH: usize = 3;
    pub const LOW: usize = 4;
    pub const CLOSE: usize = 5;
    pub const VOLUME: usize = 6;
}

/// Date format used for directory names, query parameters and CSV rows
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Pause between consecutive API requests in a batch fetch
pub const FETCH_DELAY_MS: u64 = 500;

/// Default look-back when fetching without an explicit start date
pub const DEFAULT_FETCH_DAYS: i64 = 30;

/// Default look-back for analysis endpoints without an explicit range
pub const DEFAULT_ANALYSIS_DAYS: i64 = 30;

/// Default moving average windows
pub const DEFAULT_SHORT_WINDOW: usize = 5;
pub const DEFAULT_LONG_WINDOW: usize = 20;

/// Default window for "stocks above their moving average"
pub const DEFAULT_ABOVE_MA_WINDOW: usize = 10;

/// Rolling window for average volume
pub const VOLUME_MA_WINDOW: usize = 5;

/// Z-score above which a daily move counts as a spike
pub const SPIKE_THRESHOLD: f64 = 2.0;

/// Fewest rows a series needs before spike detection runs
pub const MIN_ROWS_FOR_SPIKES: usize = 5;

/// Fewest paired (price, volume) changes for a correlation
pub const MIN_ROWS_FOR_CORRELATION: usize = 3;

/// Volume versus period average thresholds for insights
pub const HIGH_VOLUME_RATIO: f64 = 1.5;
pub const LOW_VOLUME_RATIO: f64 = 0.5;

/// Fallback "top N" when a query names no number
pub const DEFAULT_QUERY_LIMIT: usize = 5;

/// Most symbols drawn in one comparison
pub const MAX_COMPARE_SYMBOLS: usize = 5;

/// Symbols used to pad a comparison when a query names only one stock
pub const POPULAR_SYMBOLS: &[&str] = &["RELIANCE.NS", "TCS.NS", "HDFCBANK.NS", "INFY.NS"];

/// Nifty 50 constituents (NSE symbols with the Yahoo `.NS` suffix)
///
/// Used when the universe file is missing or unreadable.
pub const NIFTY50_SYMBOLS: &[&str] = &[
    "RELIANCE.NS", "TCS.NS", "HDFCBANK.NS", "INFY.NS", "ICICIBANK.NS",
    "HINDUNILVR.NS", "ITC.NS", "SBIN.NS", "BHARTIARTL.NS", "KOTAKBANK.NS",
    "LT.NS", "AXISBANK.NS", "ASIANPAINT.NS", "MARUTI.NS", "HCLTECH.NS",
    "SUNPHARMA.NS", "TATAMOTORS.NS", "ULTRACEMCO.NS", "TITAN.NS", "BAJFINANCE.NS",
    "NESTLEIND.NS", "WIPRO.NS", "TECHM.NS", "ADANIPORTS.NS", "POWERGRID.NS",
    "M&M.NS", "NTPC.NS", "GRASIM.NS", "BAJAJFINSV.NS", "HDFCLIFE.NS",
    "DIVISLAB.NS", "JSWSTEEL.NS", "TATACONSUM.NS", "SBILIFE.NS", "HINDALCO.NS",
    "DRREDDY.NS", "TATASTEEL.NS", "BRITANNIA.NS", "INDUSINDBK.NS", "CIPLA.NS",
    "EICHERMOT.NS", "COALINDIA.NS", "ONGC.NS", "BPCL.NS", "UPL.NS",
    "IOC.NS", "HEROMOTOCO.NS", "APOLLOHOSP.NS", "ADANIENT.NS", "BAJAJ-AUTO.NS",
];

/// Derived metric names written by recomputation
pub mod indicator {
    pub const MA_SHORT: &str = "ma_5";
    pub const MA_LONG: &str = "ma_20";
    pub const RETURN_PCT: &str = "return_pct";
    pub const VOLUME_CHANGE_PCT: &str = "volume_change_pct";
    pub const VOLUME_MA: &str = "volume_ma_5";
}
