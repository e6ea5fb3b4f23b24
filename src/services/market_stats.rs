use crate::error::Result;
use crate::models::{DateRange, Universe};
use crate::services::csv_store::CsvStats;
use crate::services::database::DatabaseStats;
use crate::services::Storage;
use chrono::NaiveDate;
use serde::Serialize;

/// What is stored, across both backends
#[derive(Debug, Clone, Serialize)]
pub struct MarketStats {
    pub backend: &'static str,
    pub universe_size: usize,
    pub symbols_stored: usize,
    pub has_data: bool,
    pub csv: CsvStats,
    pub database: Option<DatabaseStats>,
}

/// Stored history of one symbol
#[derive(Debug, Clone, Serialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub sector: Option<String>,
    pub record_count: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub last_close: f64,
}

pub async fn get_market_stats(storage: &Storage, universe: &Universe) -> Result<MarketStats> {
    let csv = storage.csv().stats()?;
    let database = match storage.database() {
        Some(db) => Some(db.stats().await?),
        None => None,
    };
    let symbols_stored = storage.available_symbols(None).await?.len();

    Ok(MarketStats {
        backend: storage.backend(),
        universe_size: universe.symbol_count(),
        symbols_stored,
        has_data: symbols_stored > 0,
        csv,
        database,
    })
}

/// `None` when nothing is stored for `symbol`
pub async fn get_symbol_info(storage: &Storage, universe: &Universe, symbol: &str) -> Result<Option<SymbolInfo>> {
    let (Some(first), Some(last)) = (
        storage.available_dates().await?.first().copied(),
        storage.latest_date().await?,
    ) else {
        return Ok(None);
    };

    let rows = storage.load_range(symbol, &DateRange::new(first, last)?).await?;
    let (Some(head), Some(tail)) = (rows.first(), rows.last()) else {
        return Ok(None);
    };

    Ok(Some(SymbolInfo {
        symbol: symbol.to_string(),
        sector: universe.sector_of(symbol).map(str::to_string),
        record_count: rows.len(),
        first_date: head.date,
        last_date: tail.date,
        last_close: tail.close,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StockPrice;
    use tempfile::tempdir;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_market_stats_and_symbol_info() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path().join("csv"), Some(dir.path().join("db.sqlite"))).await;
        let mut groups = std::collections::HashMap::new();
        groups.insert("IT".to_string(), vec!["TCS.NS".to_string(), "INFY.NS".to_string()]);
        let universe = Universe { groups };

        let empty = get_market_stats(&storage, &universe).await.unwrap();
        assert!(!empty.has_data);
        assert_eq!(empty.universe_size, 2);

        storage
            .save(&[
                StockPrice::new("TCS.NS", d("2024-01-01"), 1.0, 2.0, 0.5, 1.5, 10),
                StockPrice::new("TCS.NS", d("2024-01-02"), 1.5, 2.5, 1.0, 2.0, 20),
            ])
            .await
            .unwrap();

        let stats = get_market_stats(&storage, &universe).await.unwrap();
        assert!(stats.has_data);
        assert_eq!(stats.backend, "sqlite+csv");
        assert_eq!(stats.csv.file_count, 2);
        assert_eq!(stats.database.unwrap().total_records, 2);

        let info = get_symbol_info(&storage, &universe, "TCS.NS").await.unwrap().unwrap();
        assert_eq!(info.record_count, 2);
        assert_eq!(info.last_date, d("2024-01-02"));
        assert_eq!(info.last_close, 2.0);
        assert_eq!(info.sector.as_deref(), Some("IT"));

        assert!(get_symbol_info(&storage, &universe, "NOPE.NS").await.unwrap().is_none());
    }
}
