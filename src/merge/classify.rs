use arrow::array::{Array, StringArray};
use arrow::record_batch::RecordBatch;

use crate::merge::dates;

/// Column-name substrings that mark a column as date-valued outright.
const NAME_KEYWORDS: &[&str] = &["日付", "年月日", "日時", "date", "Date", "DATE"];

/// How many non-missing cells to sample per column.
const SAMPLE_SIZE: usize = 10;

/// Heuristically pick the date-like columns of a table.
///
/// A column qualifies if its name contains a date keyword, or if any of its
/// first [`SAMPLE_SIZE`] non-missing values matches a notation the
/// normalizer can convert. False negatives are accepted; false positives
/// are harmless because conversion is a no-op on non-matching values.
pub fn detect_date_columns(batch: &RecordBatch) -> Vec<String> {
    let mut date_columns = Vec::new();

    for (idx, field) in batch.schema().fields().iter().enumerate() {
        let name = field.name();
        if NAME_KEYWORDS.iter().any(|kw| name.contains(kw)) {
            date_columns.push(name.clone());
            continue;
        }
        if let Some(values) = batch.column(idx).as_any().downcast_ref::<StringArray>() {
            if sample_contains_date(values) {
                date_columns.push(name.clone());
            }
        }
    }

    date_columns
}

fn sample_contains_date(values: &StringArray) -> bool {
    let mut sampled = 0;
    for i in 0..values.len() {
        if sampled == SAMPLE_SIZE {
            break;
        }
        if values.is_null(i) {
            continue;
        }
        let v = values.value(i).trim();
        if v.is_empty() {
            continue;
        }
        sampled += 1;
        if dates::looks_like_date(v) {
            return true;
        }
    }
    false
}
