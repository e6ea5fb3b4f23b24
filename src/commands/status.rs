use super::{block_on, exit_with};
use crate::constants::POPULAR_SYMBOLS;
use crate::error::Result;
use crate::models::Universe;
use crate::services::{get_market_stats, get_symbol_info, Storage};
use crate::utils::{format_currency, format_number, get_data_dir, get_universe_file};

pub fn run() {
    println!("📊 Market Data Status\n");

    if let Err(e) = block_on(show_status()) {
        exit_with(e);
    }
}

async fn show_status() -> Result<()> {
    let storage = Storage::from_env().await;
    let universe = Universe::load_or_default(get_universe_file());
    let stats = get_market_stats(&storage, &universe).await?;

    println!("💾 Backend:  {}", stats.backend);
    println!("📁 Data dir: {}", get_data_dir().display());
    println!("📈 Universe: {} symbols", stats.universe_size);

    if !stats.has_data {
        println!("\n⚠️  No market data found. Run 'fetch' first.");
        return Ok(());
    }

    println!("\n═══════════════════════════════════════════════════════════\n");
    println!(
        "📄 CSV:      {:>8} files over {} dates ({} → {})",
        format_number(stats.csv.file_count),
        stats.csv.date_count,
        stats.csv.first_date.map(|d| d.to_string()).unwrap_or_default(),
        stats.csv.last_date.map(|d| d.to_string()).unwrap_or_default(),
    );
    if let Some(db) = &stats.database {
        println!(
            "🗄️  Database: {:>8} records, {} symbols, {} metric rows",
            format_number(db.total_records.max(0) as usize),
            db.unique_symbols,
            format_number(db.metric_rows.max(0) as usize),
        );
    }
    println!("🔢 Symbols stored: {}", stats.symbols_stored);

    println!("\n═══════════════════════════════════════════════════════════\n");
    for symbol in POPULAR_SYMBOLS {
        match get_symbol_info(&storage, &universe, symbol).await? {
            Some(info) => {
                println!("🔹 {} ({})", info.symbol, info.sector.as_deref().unwrap_or("Unknown sector"));
                println!(
                    "   Daily:  {:>8} records  ({} → {})",
                    format_number(info.record_count),
                    info.first_date,
                    info.last_date
                );
                println!("           Latest: {}", format_currency(info.last_close));
            }
            None => println!("🔹 {} - no data", symbol),
        }
    }

    Ok(())
}
