use anyhow::{Context, Result};
use senkyo_stats::series::load_series;
use std::{env, path::Path, process::exit};

fn main() {
    // <DATA_DIR> <ENTITY_CODE> <CATEGORY> with an optional year range.
    let args: Vec<String> = env::args().collect();
    if args.len() != 4 && args.len() != 6 {
        eprintln!(
            "Usage: {} <DATA_DIR> <ENTITY_CODE> <CATEGORY> [START_YEAR END_YEAR]",
            args[0]
        );
        exit(1);
    }
    if let Err(e) = export_series(&args) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

/// Print one municipality's election series as JSON for the charting
/// front end.
fn export_series(args: &[String]) -> Result<()> {
    let mut categories = args[3].chars();
    let category = match (categories.next(), categories.next()) {
        (Some(c), None) => c,
        _ => anyhow::bail!("CATEGORY must be a single letter, got '{}'", args[3]),
    };

    let mut series = load_series(Path::new(&args[1]), &args[2], category)?;
    if args.len() == 6 {
        let start: i32 = args[4]
            .parse()
            .with_context(|| format!("START_YEAR must be an integer, got '{}'", args[4]))?;
        let end: i32 = args[5]
            .parse()
            .with_context(|| format!("END_YEAR must be an integer, got '{}'", args[5]))?;
        series.restrict_years(start, end);
    }

    println!("{}", serde_json::to_string_pretty(&series)?);
    Ok(())
}
