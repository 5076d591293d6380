use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, Date32Builder, StringArray};
use arrow::datatypes::{DataType, Date32Type, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::merge::{
    classify, dates,
    group::{scan_directory, SourceGroup},
    table,
};

/// Output subdirectory created under the data directory.
pub const OUTPUT_DIR: &str = "merged_output";

#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Disable to keep date columns as raw text.
    pub convert_dates: bool,
    /// Explicit date columns, intersected with those actually present;
    /// `None` means auto-detect.
    pub date_columns: Option<Vec<String>>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            convert_dates: true,
            date_columns: None,
        }
    }
}

/// What one group's merge produced.
#[derive(Debug)]
pub struct GroupReport {
    pub entity_code: String,
    pub category: char,
    pub output_path: PathBuf,
    pub file_count: usize,
    pub total_rows: usize,
    pub year_range: (i32, i32),
    pub date_columns: Vec<String>,
}

#[derive(Debug)]
pub struct GroupFailure {
    pub entity_code: String,
    pub category: char,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub groups: Vec<GroupReport>,
    pub failures: Vec<GroupFailure>,
}

/// Run the whole merge over `dir`: scan, then process each group in turn.
///
/// A group that fails (unreadable file, duplicate year) is logged and
/// recorded in the report; the remaining groups still run. Outputs land in
/// `dir/merged_output`, one file per group, overwritten on re-run.
pub fn merge_directory(dir: &Path, opts: &MergeOptions) -> Result<RunReport> {
    let groups = scan_directory(dir)?;
    info!(dir = %dir.display(), groups = groups.len(), "scanned data directory");

    let out_dir = dir.join(OUTPUT_DIR);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let mut report = RunReport::default();
    for group in &groups {
        match merge_group(group, &out_dir, opts) {
            Ok(done) => {
                info!(
                    output = %done.output_path.display(),
                    files = done.file_count,
                    rows = done.total_rows,
                    years = ?done.year_range,
                    "merged group"
                );
                report.groups.push(done);
            }
            Err(e) => {
                error!(
                    "merge of {}/{} failed: {:#}",
                    group.entity_code, group.category, e
                );
                report.failures.push(GroupFailure {
                    entity_code: group.entity_code.clone(),
                    category: group.category,
                    error: format!("{:#}", e),
                });
            }
        }
    }
    Ok(report)
}

fn merge_group(group: &SourceGroup, out_dir: &Path, opts: &MergeOptions) -> Result<GroupReport> {
    group.ensure_distinct_years()?;
    let year_range = group
        .year_range()
        .context("group has no source files")?;

    let mut tables = Vec::with_capacity(group.files.len());
    for file in &group.files {
        let batch = table::read_table(&file.path)?;
        info!(
            file = %file.path.display(),
            rows = batch.num_rows(),
            year = file.year,
            "read source file"
        );
        tables.push(batch);
    }

    // files arrive sorted by year, so plain vertical concat keeps the
    // chronological order
    let mut merged = table::union_concat(&tables)?;

    let date_columns = if opts.convert_dates {
        match &opts.date_columns {
            Some(requested) => requested
                .iter()
                .filter(|name| merged.column_by_name(name.as_str()).is_some())
                .cloned()
                .collect(),
            None => classify::detect_date_columns(&merged),
        }
    } else {
        Vec::new()
    };
    if !date_columns.is_empty() {
        info!(columns = ?date_columns, "converting date columns");
        merged = convert_date_columns(&merged, &date_columns)?;
    }

    let output_path = out_dir.join(group.output_name());
    table::write_table(&merged, &output_path)?;

    Ok(GroupReport {
        entity_code: group.entity_code.clone(),
        category: group.category,
        output_path,
        file_count: group.files.len(),
        total_rows: merged.num_rows(),
        year_range,
        date_columns,
    })
}

/// Normalize each named column's text and coerce it to `Date32`. A cell
/// becomes a date only if its normalized form is a valid calendar date;
/// anything else (verbatim text, a textual `13` month) becomes null.
fn convert_date_columns(batch: &RecordBatch, date_columns: &[String]) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(batch.num_columns());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());

    for (idx, field) in batch.schema().fields().iter().enumerate() {
        let col = batch.column(idx);
        let is_target = date_columns.iter().any(|name| name == field.name());
        match (is_target, col.as_any().downcast_ref::<StringArray>()) {
            (true, Some(values)) => {
                let mut builder = Date32Builder::with_capacity(values.len());
                for cell in values.iter() {
                    let day = match dates::normalize(cell) {
                        dates::Normalized::Iso(iso) => {
                            NaiveDate::parse_from_str(&iso, "%Y-%m-%d").ok()
                        }
                        dates::Normalized::Missing | dates::Normalized::Verbatim(_) => None,
                    };
                    builder.append_option(day.map(Date32Type::from_naive_date));
                }
                fields.push(Field::new(field.name(), DataType::Date32, true));
                arrays.push(Arc::new(builder.finish()) as ArrayRef);
            }
            _ => {
                fields.push(field.as_ref().clone());
                arrays.push(col.clone());
            }
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .context("rebuilding table with coerced date columns")
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use std::fs;
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn text_column(batch: &RecordBatch, name: &str) -> Vec<Option<String>> {
        let col = batch
            .column_by_name(name)
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        (0..col.len())
            .map(|i| {
                if col.is_null(i) {
                    None
                } else {
                    Some(col.value(i).to_string())
                }
            })
            .collect()
    }

    #[test]
    fn merges_a_group_in_year_order_with_normalized_dates() -> anyhow::Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        // written newest-first on purpose; the 2024 file carries an extra
        // column the 2020 file lacks
        fs::write(
            dir.path().join("oosk2024a_cleaned.csv"),
            "投票日,投票率,備考\n2024年4月7日,48.0%,補選\n",
        )?;
        fs::write(
            dir.path().join("oosk2020a_cleaned.csv"),
            "投票日,投票率\n2020年4月1日,52.3%\n2020/11/1,50.1%\n",
        )?;
        fs::write(
            dir.path().join("oosk2020b_cleaned.csv"),
            "投票日,定数/候補者数\n2020年4月,25/30\n",
        )?;

        let report = merge_directory(dir.path(), &MergeOptions::default())?;
        assert_eq!(report.groups.len(), 2);
        assert!(report.failures.is_empty());

        let group_a = &report.groups[0];
        assert_eq!(group_a.entity_code, "oosk");
        assert_eq!(group_a.category, 'a');
        assert_eq!(group_a.file_count, 2);
        assert_eq!(group_a.total_rows, 3);
        assert_eq!(group_a.year_range, (2020, 2024));
        assert_eq!(group_a.date_columns, vec!["投票日"]);

        // output is BOM-prefixed
        let raw = fs::read(&group_a.output_path)?;
        assert_eq!(&raw[..3], [0xEF, 0xBB, 0xBF]);

        // 2020 rows come first despite the 2024 file sorting earlier on disk
        let merged = table::read_table(&group_a.output_path)?;
        assert_eq!(
            text_column(&merged, "投票日"),
            vec![
                Some("2020-04-01".into()),
                Some("2020-11-01".into()),
                Some("2024-04-07".into())
            ]
        );
        // the 2020 rows have no 備考 column; union fills them empty
        let remarks = text_column(&merged, "備考");
        assert_eq!(remarks[2].as_deref(), Some("補選"));
        assert!(remarks[0].as_deref().unwrap_or("").is_empty());

        // day-less notation defaults to the first of the month
        let group_b = &report.groups[1];
        let merged_b = table::read_table(&group_b.output_path)?;
        assert_eq!(
            text_column(&merged_b, "投票日"),
            vec![Some("2020-04-01".into())]
        );
        Ok(())
    }

    #[test]
    fn single_file_group_round_trips_shape() -> anyhow::Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        fs::write(
            dir.path().join("ski2021a_cleaned.csv"),
            "投票日,投票率,有権者数\n2021年10月31日,55.0%,\"683,000\"\n",
        )?;

        let report = merge_directory(dir.path(), &MergeOptions::default())?;
        assert_eq!(report.groups.len(), 1);

        let merged = table::read_table(&report.groups[0].output_path)?;
        assert_eq!(merged.num_rows(), 1);
        assert_eq!(merged.num_columns(), 3);
        assert_eq!(
            text_column(&merged, "有権者数"),
            vec![Some("683,000".into())]
        );
        Ok(())
    }

    #[test]
    fn unparseable_date_cells_degrade_to_empty() -> anyhow::Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        fs::write(
            dir.path().join("yo2019a_cleaned.csv"),
            "投票日,投票率\n不明,40.0%\n2019年4月21日,41.5%\n",
        )?;

        let report = merge_directory(dir.path(), &MergeOptions::default())?;
        let merged = table::read_table(&report.groups[0].output_path)?;
        let dates = text_column(&merged, "投票日");
        assert!(dates[0].as_deref().unwrap_or("").is_empty());
        assert_eq!(dates[1].as_deref(), Some("2019-04-21"));
        Ok(())
    }

    #[test]
    fn explicit_date_columns_are_intersected_with_present_ones() -> anyhow::Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        fs::write(
            dir.path().join("suita2022a_cleaned.csv"),
            "投票日,投票率\n2022年4月10日,49.9%\n",
        )?;

        let opts = MergeOptions {
            convert_dates: true,
            date_columns: Some(vec!["投票日".to_string(), "告示日".to_string()]),
        };
        let report = merge_directory(dir.path(), &opts)?;
        assert_eq!(report.groups[0].date_columns, vec!["投票日"]);
        Ok(())
    }

    #[test]
    fn date_conversion_can_be_disabled() -> anyhow::Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        fs::write(
            dir.path().join("tktk2023a_cleaned.csv"),
            "投票日,投票率\n2023年4月23日,44.1%\n",
        )?;

        let opts = MergeOptions {
            convert_dates: false,
            date_columns: None,
        };
        let report = merge_directory(dir.path(), &opts)?;
        assert!(report.groups[0].date_columns.is_empty());

        let merged = table::read_table(&report.groups[0].output_path)?;
        assert_eq!(
            text_column(&merged, "投票日"),
            vec![Some("2023年4月23日".into())]
        );
        Ok(())
    }

    #[test]
    fn failing_group_does_not_stop_the_others() -> anyhow::Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        // ragged row count makes this file unreadable as a table
        fs::write(
            dir.path().join("hrkt2020a_cleaned.csv"),
            "投票日,投票率\n2020年8月30日,45.0%,extra\n",
        )?;
        fs::write(
            dir.path().join("oosk2020a_cleaned.csv"),
            "投票日,投票率\n2020年4月1日,52.3%\n",
        )?;

        let report = merge_directory(dir.path(), &MergeOptions::default())?;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].entity_code, "hrkt");
        assert_eq!(report.groups.len(), 1);
        assert!(report.groups[0].output_path.exists());
        assert!(!dir
            .path()
            .join(OUTPUT_DIR)
            .join("hrkt_a_merged.csv")
            .exists());
        Ok(())
    }
}
