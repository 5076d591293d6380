// src/series.rs
//! Data layer behind the dashboard chart: loads one merged dataset and maps
//! its native-language columns onto canonical metric fields, cleaning
//! numeric text ("52.3%", "1,234") and splitting the 定数/候補者数 pair
//! along the way.

use anyhow::{Context, Result};
use arrow::array::{Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::merge::{dates, table, OUTPUT_DIR};
use crate::registry;

const COL_VOTE_DATE: &str = "投票日";
const COL_TURNOUT_RATE: &str = "投票率";
const COL_TOTAL_VOTERS: &str = "有権者数";
const COL_MALE_VOTERS: &str = "男性";
const COL_FEMALE_VOTERS: &str = "女性";
const COL_SEATS_CANDIDATES: &str = "定数/候補者数";

/// One election viewed through canonical metric fields. Every field is
/// optional; absence means the source cell was missing or unparseable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ElectionRecord {
    pub vote_date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub turnout_rate: Option<f64>,
    pub total_voters: Option<f64>,
    pub male_voters: Option<f64>,
    pub female_voters: Option<f64>,
    pub fixed_seats: Option<f64>,
    pub candidate_count: Option<f64>,
    pub candidate_ratio: Option<f64>,
}

/// The records of one (municipality, category) merged dataset.
#[derive(Debug, Serialize)]
pub struct ElectionSeries {
    pub entity_code: String,
    pub category: char,
    pub municipality: Option<String>,
    pub category_label: Option<String>,
    pub records: Vec<ElectionRecord>,
}

impl ElectionSeries {
    /// Keep only records whose vote year falls in `start..=end`. Records
    /// without a parseable vote date are dropped.
    pub fn restrict_years(&mut self, start: i32, end: i32) {
        self.records
            .retain(|r| matches!(r.year, Some(y) if (start..=end).contains(&y)));
    }
}

/// Load the merged dataset for one municipality and category from
/// `data_dir/merged_output`.
pub fn load_series(data_dir: &Path, entity_code: &str, category: char) -> Result<ElectionSeries> {
    let path = data_dir
        .join(OUTPUT_DIR)
        .join(format!("{}_{}_merged.csv", entity_code, category));
    let batch = table::read_table(&path)
        .with_context(|| format!("loading merged dataset {}", path.display()))?;
    let records = records_from_batch(&batch);
    info!(
        file = %path.display(),
        records = records.len(),
        "loaded election series"
    );

    Ok(ElectionSeries {
        entity_code: entity_code.to_string(),
        category,
        municipality: registry::municipality_name(entity_code).map(str::to_string),
        category_label: registry::category_label(category).map(str::to_string),
        records,
    })
}

/// Map each row of a merged table onto an [`ElectionRecord`]. Columns the
/// table doesn't carry simply leave their fields empty.
pub fn records_from_batch(batch: &RecordBatch) -> Vec<ElectionRecord> {
    let vote_date = text_column(batch, COL_VOTE_DATE);
    let turnout = text_column(batch, COL_TURNOUT_RATE);
    let total = text_column(batch, COL_TOTAL_VOTERS);
    let male = text_column(batch, COL_MALE_VOTERS);
    let female = text_column(batch, COL_FEMALE_VOTERS);
    let seats = text_column(batch, COL_SEATS_CANDIDATES);

    (0..batch.num_rows())
        .map(|row| {
            let vote_date = vote_date
                .and_then(|col| cell(col, row))
                .and_then(parse_vote_date);
            let (fixed_seats, candidate_count) = seats
                .and_then(|col| cell(col, row))
                .map_or((None, None), split_seats_candidates);
            let candidate_ratio = match (fixed_seats, candidate_count) {
                (Some(s), Some(c)) if c != 0.0 => Some(s / c),
                _ => None,
            };

            ElectionRecord {
                vote_date,
                year: vote_date.map(|d| d.year()),
                turnout_rate: turnout.and_then(|col| cell(col, row)).and_then(clean_numeric),
                total_voters: total.and_then(|col| cell(col, row)).and_then(clean_numeric),
                male_voters: male.and_then(|col| cell(col, row)).and_then(clean_numeric),
                female_voters: female.and_then(|col| cell(col, row)).and_then(clean_numeric),
                fixed_seats,
                candidate_count,
                candidate_ratio,
            }
        })
        .collect()
}

/// Strip percent signs and thousands separators, then parse as a float.
pub fn clean_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().replace(['%', ','], "");
    if cleaned.is_empty() {
        None
    } else {
        cleaned.parse().ok()
    }
}

/// `"25/30"` → seats 25, candidates 30. Without a slash the whole value is
/// read as the seat count; either side may fail independently.
fn split_seats_candidates(raw: &str) -> (Option<f64>, Option<f64>) {
    match raw.split_once('/') {
        Some((seats, candidates)) => (clean_numeric(seats), clean_numeric(candidates)),
        None => (clean_numeric(raw), None),
    }
}

fn parse_vote_date(raw: &str) -> Option<NaiveDate> {
    match dates::normalize(Some(raw)) {
        dates::Normalized::Iso(iso) => NaiveDate::parse_from_str(&iso, "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn text_column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a StringArray> {
    batch.column_by_name(name)?.as_any().downcast_ref()
}

fn cell<'a>(col: &'a StringArray, row: usize) -> Option<&'a str> {
    if col.is_null(row) {
        return None;
    }
    let v = col.value(row).trim();
    (!v.is_empty()).then_some(v)
}
