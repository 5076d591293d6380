use anyhow::Result;
use senkyo_stats::merge::{merge_directory, MergeOptions};
use std::{env, path::Path};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();
    info!("startup");

    // ─── 2) run the merge over the data directory ────────────────────
    let data_dir = env::args().nth(1).unwrap_or_else(|| "data".to_string());
    let report = merge_directory(Path::new(&data_dir), &MergeOptions::default())?;

    // ─── 3) summarize ────────────────────────────────────────────────
    if report.groups.is_empty() && report.failures.is_empty() {
        warn!("no *_cleaned.csv files found under {}", data_dir);
        return Ok(());
    }
    for group in &report.groups {
        info!(
            "✓ {} ({} files, {} rows, {}–{})",
            group.output_path.display(),
            group.file_count,
            group.total_rows,
            group.year_range.0,
            group.year_range.1
        );
    }
    for failure in &report.failures {
        warn!(
            "✗ {}/{}: {}",
            failure.entity_code, failure.category, failure.error
        );
    }
    info!(
        merged = report.groups.len(),
        failed = report.failures.len(),
        "all done"
    );
    Ok(())
}
