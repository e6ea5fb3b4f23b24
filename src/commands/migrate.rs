use super::{block_on, exit_with, progress_bar};
use crate::error::Result;
use crate::services::{MigrationReport, Storage};
use crate::utils::{format_number, get_data_dir};

pub fn run() {
    println!("🔄 Migrating CSV data from {} into the database", get_data_dir().display());

    match block_on(migrate()) {
        Ok(report) => {
            println!("\n✅ Migration complete in {}s", report.duration_secs);
            println!("   📅 Dates:   {}", report.dates);
            println!("   📈 Records: {}", format_number(report.records));
            if !report.errors.is_empty() {
                println!("\n⚠️  {} errors:", report.errors.len());
                for error in &report.errors {
                    println!("   {}", error);
                }
            }
        }
        Err(e) => exit_with(e),
    }
}

async fn migrate() -> Result<MigrationReport> {
    let storage = Storage::from_env().await;
    let dates = storage.csv().available_dates()?;
    let pb = progress_bar(dates.len());
    let report = storage
        .migrate_csv_to_db(|done, _| pb.set_position(done as u64))
        .await;
    pb.finish_and_clear();
    report
}
