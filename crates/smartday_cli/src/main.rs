//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `smartday_core` linkage.
//! - Optionally open a store file and print a metadata-only summary.

use smartday_core::{AppStore, SqliteStateStorage, StoreError, SystemClock};
use std::process::ExitCode;

const STORE_DB_PATH_ENV: &str = "SMARTDAY_DB_PATH";

fn main() -> ExitCode {
    println!("smartday_core ping={}", smartday_core::ping());
    println!("smartday_core version={}", smartday_core::core_version());

    let Some(path) = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(STORE_DB_PATH_ENV).ok())
        .filter(|path| !path.trim().is_empty())
    else {
        return ExitCode::SUCCESS;
    };

    let store = match SqliteStateStorage::open(path.trim())
        .map_err(StoreError::from)
        .and_then(|storage| AppStore::open(storage, SystemClock))
    {
        Ok(store) => store,
        Err(err) => {
            eprintln!("store open failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    let metrics = store.workload_metrics();
    println!("store tasks={} events={}", store.tasks().len(), store.events().len());
    println!("store completion_rate={:.1}", store.completion_rate());
    println!(
        "store pending={} estimated_minutes={} high_priority={} average_priority={:.2}",
        metrics.pending_count,
        metrics.total_estimated_time,
        metrics.high_priority_count,
        metrics.average_priority
    );
    ExitCode::SUCCESS
}
