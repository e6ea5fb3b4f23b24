pub mod analyze;
pub mod clear;
pub mod fetch;
pub mod migrate;
pub mod query;
pub mod serve;
pub mod status;

use crate::error::{AppError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;

/// Run `future` on a fresh multi-threaded runtime
pub(crate) fn block_on<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| AppError::Other(format!("Failed to create runtime: {}", e)))?;
    runtime.block_on(future)
}

/// Print the error and exit with status 1
pub(crate) fn exit_with(e: AppError) -> ! {
    eprintln!("❌ Error: {}", e);
    std::process::exit(1);
}

pub(crate) fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
