use anyhow::Result;
use arrow::array::{Array, StringArray};
use senkyo_stats::merge::{classify, table};
use std::{env, path::Path, process::exit};

fn main() {
    // Expect exactly one CLI argument: path to a merged CSV file.
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <MERGED_CSV>", args[0]);
        exit(1);
    }
    if let Err(e) = inspect_merged(Path::new(&args[1])) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

/// Print the shape of one merged file: columns, which look date-valued, and
/// how many rows carry a vote date.
fn inspect_merged(path: &Path) -> Result<()> {
    let batch = table::read_table(path)?;

    println!("=== {} ===", path.display());
    println!("Rows:    {}", batch.num_rows());
    println!("Columns: {}", batch.num_columns());
    println!();

    let date_columns = classify::detect_date_columns(&batch);
    println!("=== Columns ===");
    for field in batch.schema().fields() {
        let marker = if date_columns.iter().any(|c| c == field.name()) {
            " (date-like)"
        } else {
            ""
        };
        println!("- {}{}", field.name(), marker);
    }
    println!();

    if let Some(col) = batch.column_by_name("投票日") {
        if let Some(values) = col.as_any().downcast_ref::<StringArray>() {
            let filled = (0..values.len())
                .filter(|&i| !values.is_null(i) && !values.value(i).trim().is_empty())
                .count();
            println!(
                "Vote-date coverage: {}/{} rows",
                filled,
                batch.num_rows()
            );
        }
    } else {
        println!("No 投票日 column");
    }
    Ok(())
}
