use super::{block_on, exit_with};
use crate::services::Storage;
use crate::utils::parse_date;

pub fn run(date: String) {
    let date = match parse_date(&date) {
        Ok(date) => date,
        Err(e) => exit_with(e),
    };

    match block_on(async { Storage::from_env().await.clear_date(date).await }) {
        Ok(summary) if summary.db_rows == 0 && summary.csv_files == 0 => {
            println!("⚠️  Nothing stored for {}", summary.date);
        }
        Ok(summary) => {
            println!("🗑️  Cleared {}", summary.date);
            println!("   💾 Database rows: {}", summary.db_rows);
            println!("   📄 CSV files:     {}", summary.csv_files);
        }
        Err(e) => exit_with(e),
    }
}
