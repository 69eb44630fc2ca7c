//! Columnar artifact schema
//!
//! Fixed columns come first, then one nullable utf8 column per dynamic field,
//! unioned across the records of a flush in first-seen order.

use crate::storage::ExtractionRecord;
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use std::collections::HashSet;
use std::sync::Arc;

/// File extension of columnar artifacts
pub const PARQUET_EXTENSION: &str = "parquet";

/// Columns every artifact carries, in order
pub const FIXED_COLUMNS: [&str; 8] = [
    "url",
    "processed_at",
    "error",
    "batch_index",
    "attempt",
    "processing_time",
    "layout",
    "truncated",
];

/// Columns an artifact must carry to be evaluated
pub const REQUIRED_COLUMNS: [&str; 4] = ["url", "processing_time", "error", "batch_index"];

/// Returns the column name for a dynamic field
///
/// A field whose normalized name collides with a fixed column is prefixed with `field_`.
pub fn dynamic_column_name(field: &str) -> String {
    if FIXED_COLUMNS.contains(&field) {
        format!("field_{}", field)
    } else {
        field.to_string()
    }
}

fn dynamic_fields(records: &[ExtractionRecord]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut fields = Vec::new();

    for record in records {
        for name in record.fields.keys() {
            if seen.insert(name.as_str()) {
                fields.push(name.as_str());
            }
        }
    }

    fields
}

fn arrow_schema(dynamic: &[&str]) -> Schema {
    let mut columns = vec![
        Field::new("url", DataType::Utf8, false),
        Field::new("processed_at", DataType::Utf8, false),
        Field::new("error", DataType::Utf8, true),
        Field::new("batch_index", DataType::Int64, false),
        Field::new("attempt", DataType::Int64, false),
        Field::new("processing_time", DataType::Float64, false),
        Field::new("layout", DataType::Utf8, true),
        Field::new("truncated", DataType::Boolean, false),
    ];

    columns.extend(
        dynamic
            .iter()
            .map(|name| Field::new(dynamic_column_name(name), DataType::Utf8, true)),
    );

    Schema::new(columns)
}

/// Converts a group of records into one Arrow record batch
///
/// Dynamic fields missing from a record are stored as null.
pub fn records_to_batch(records: &[ExtractionRecord]) -> Result<RecordBatch, ArrowError> {
    let dynamic = dynamic_fields(records);
    let schema = Arc::new(arrow_schema(&dynamic));

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.url.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.processed_at.to_rfc3339()),
        )),
        Arc::new(
            records
                .iter()
                .map(|r| r.error.as_deref())
                .collect::<StringArray>(),
        ),
        Arc::new(Int64Array::from_iter_values(
            records.iter().map(|r| r.batch_index as i64),
        )),
        Arc::new(Int64Array::from_iter_values(
            records.iter().map(|r| i64::from(r.attempt)),
        )),
        Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.processing_time),
        )),
        Arc::new(
            records
                .iter()
                .map(|r| r.layout.map(|l| l.as_str()))
                .collect::<StringArray>(),
        ),
        Arc::new(BooleanArray::from(
            records.iter().map(|r| r.truncated).collect::<Vec<_>>(),
        )),
    ];

    for name in &dynamic {
        let values: StringArray = records
            .iter()
            .map(|r| r.fields.get(*name).and_then(|v| v.as_deref()))
            .collect();
        columns.push(Arc::new(values));
    }

    RecordBatch::try_new(schema, columns)
}
