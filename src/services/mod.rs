pub mod analysis;
pub mod charts;
pub mod csv_store;
pub mod data_sync;
pub mod database;
pub mod market_stats;
pub mod query;
pub mod storage;
pub mod yahoo;

pub use charts::Figure;
pub use csv_store::{CsvStats, CsvStore};
pub use data_sync::{DataSync, SyncReport};
pub use database::{DatabaseStats, PriceDatabase};
pub use market_stats::{get_market_stats, get_symbol_info, MarketStats, SymbolInfo};
pub use query::{QueryAssistant, QueryIntent, QueryResponse, QueryResult};
pub use storage::{ClearSummary, MigrationReport, SaveSummary, SharedStorage, Storage};
pub use yahoo::{FetchBatch, FetchFailure, YahooClient};
