use anyhow::{Context, Result};
use arrow::array::{new_null_array, ArrayRef};
use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const BATCH_SIZE: usize = 8192;

/// Read a CSV file into one batch with every column as nullable text, so
/// cell contents stay verbatim until date coercion. A leading UTF-8 BOM is
/// tolerated and stripped.
pub fn read_table(path: &Path) -> Result<RecordBatch> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);

    // infer only to discover the column names; types are forced to Utf8
    let format = Format::default().with_header(true);
    let (inferred, _) = format
        .infer_schema(Cursor::new(bytes), Some(100))
        .with_context(|| format!("inferring columns of {}", path.display()))?;
    let fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|f| Field::new(f.name(), DataType::Utf8, true))
        .collect();
    let schema: SchemaRef = Arc::new(Schema::new(fields));

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .build(Cursor::new(bytes))
        .with_context(|| format!("opening {} as CSV", path.display()))?;
    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parsing {}", path.display()))?;

    concat_batches(&schema, &batches)
        .with_context(|| format!("assembling rows of {}", path.display()))
}

/// Row-wise append with column union: a column absent from one input shows
/// up as nulls for its rows. Union column order is first appearance across
/// the inputs, which the caller passes in ascending year order.
pub fn union_concat(batches: &[RecordBatch]) -> Result<RecordBatch> {
    let mut columns: Vec<String> = Vec::new();
    for batch in batches {
        for field in batch.schema().fields() {
            if !columns.iter().any(|c| c == field.name()) {
                columns.push(field.name().clone());
            }
        }
    }

    let fields: Vec<Field> = columns
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    let schema: SchemaRef = Arc::new(Schema::new(fields));

    let mut aligned = Vec::with_capacity(batches.len());
    for batch in batches {
        let arrays: Vec<ArrayRef> = columns
            .iter()
            .map(|name| match batch.column_by_name(name) {
                Some(col) => col.clone(),
                None => new_null_array(&DataType::Utf8, batch.num_rows()),
            })
            .collect();
        aligned.push(
            RecordBatch::try_new(schema.clone(), arrays)
                .context("aligning batch to the union schema")?,
        );
    }

    concat_batches(&schema, &aligned).context("concatenating aligned batches")
}

/// Write `batch` as CSV with a header row, UTF-8 with a byte-order marker
/// for spreadsheet compatibility. Null cells become empty fields; Date32
/// cells render as `YYYY-MM-DD`.
pub fn write_table(batch: &RecordBatch, path: &Path) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    file.write_all(UTF8_BOM)
        .with_context(|| format!("writing BOM to {}", path.display()))?;

    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer
        .write(batch)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
