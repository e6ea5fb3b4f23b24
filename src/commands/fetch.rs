use super::{block_on, exit_with, progress_bar};
use crate::constants::DEFAULT_FETCH_DAYS;
use crate::error::Result;
use crate::models::{DateRange, Universe};
use crate::services::{DataSync, Storage, SyncReport, YahooClient};
use crate::utils::{format_number, get_universe_file, get_yahoo_base_url, parse_optional_date, today};

/// Symbols from a comma-separated list, or the whole universe
fn resolve_symbols(symbols: Option<String>) -> Vec<String> {
    let requested: Vec<String> = symbols
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    if requested.is_empty() {
        Universe::load_or_default(get_universe_file()).all_symbols()
    } else {
        requested
    }
}

fn resolve_range(start: Option<String>, end: Option<String>, days: i64) -> Result<DateRange> {
    let end = parse_optional_date(end.as_deref())?.unwrap_or_else(today);
    let start = match parse_optional_date(start.as_deref())? {
        Some(start) => start,
        None => DateRange::days_before(end, days)?,
    };
    DateRange::new(start, end)
}

pub fn run(symbols: Option<String>, start: Option<String>, end: Option<String>, days: Option<i64>) {
    let range = match resolve_range(start, end, days.unwrap_or(DEFAULT_FETCH_DAYS)) {
        Ok(range) => range,
        Err(e) => exit_with(e),
    };
    let symbols = resolve_symbols(symbols);
    println!("📥 Fetching {} symbols for {}", symbols.len(), range);

    match block_on(fetch(symbols, range)) {
        Ok(report) => print_report(&report),
        Err(e) => exit_with(e),
    }
}

async fn fetch(symbols: Vec<String>, range: DateRange) -> Result<SyncReport> {
    let storage = Storage::from_env().await;
    let client = YahooClient::new(get_yahoo_base_url())?;

    let pb = progress_bar(symbols.len());
    let report = DataSync::new(&client, &storage)
        .run(&symbols, &range, |done, _, symbol| {
            pb.set_position(done as u64);
            pb.set_message(symbol.to_string());
        })
        .await;
    pb.finish_and_clear();
    report
}

fn print_report(report: &SyncReport) {
    println!("\n✅ Fetch complete in {:.1}s", report.duration_secs);
    println!("   📈 Symbols ok:     {}/{}", report.succeeded.len(), report.requested);
    println!("   📅 Rows fetched:   {}", format_number(report.total_rows()));
    println!("   💾 Database rows:  {}", format_number(report.db_rows));
    println!("   📄 CSV files:      {}", format_number(report.csv_files));
    println!("   🧮 Metric rows:    {}", format_number(report.metric_rows));

    if !report.failures.is_empty() {
        println!("\n⚠️  {} symbols failed:", report.failures.len());
        for failure in &report.failures {
            println!("   {} - {}", failure.symbol, failure.error);
        }
    }
}
