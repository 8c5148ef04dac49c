use arrow::array::{
    Array, ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder,
    TimestampMillisecondArray, TimestampMillisecondBuilder,
};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::TIMESTAMP_FIELD;
use crate::error::{BenchError, Result};
use crate::pipeline::normalize::FlatRecord;

const UTC: &str = "UTC";

/// Flat records as an arrow `RecordBatch`.
///
/// `timestamp` is the first column, a millisecond UTC timestamp. The other
/// columns are the union of every record's fields in first-seen order, typed
/// from their values: all-boolean, all-integer or all-numeric columns get
/// the matching arrow type, anything else is Utf8. Missing cells are null.
#[derive(Debug, Clone)]
pub struct BenchmarkTable {
    batch: RecordBatch,
}

impl BenchmarkTable {
    /// Drain the record stream; the first error aborts assembly.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<FlatRecord>>,
    {
        let mut names: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut cells: Vec<Vec<Value>> = Vec::new();
        let mut timestamps = TimestampMillisecondBuilder::new();
        let mut rows = 0;

        for record in records {
            let record = record?;
            timestamps.append_value(timestamp_ms(&record)?);

            for (key, value) in record.into_map() {
                if key == TIMESTAMP_FIELD {
                    continue;
                }
                let col = *positions.entry(key.clone()).or_insert_with(|| {
                    names.push(key);
                    cells.push(vec![Value::Null; rows]);
                    names.len() - 1
                });
                cells[col].push(value);
            }
            rows += 1;
            for column in cells.iter_mut() {
                if column.len() < rows {
                    column.push(Value::Null);
                }
            }
        }

        let mut fields = vec![Field::new(
            TIMESTAMP_FIELD,
            DataType::Timestamp(TimeUnit::Millisecond, Some(UTC.into())),
            false,
        )];
        let mut arrays: Vec<ArrayRef> = vec![Arc::new(timestamps.finish().with_timezone(UTC))];
        for (name, values) in names.iter().zip(&cells) {
            let array = json_column(values);
            fields.push(Field::new(name, array.data_type().clone(), true));
            arrays.push(array);
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Ok(Self { batch })
    }

    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Column names excluding `timestamp`
    pub fn columns(&self) -> Vec<&str> {
        self.batch
            .schema_ref()
            .fields()
            .iter()
            .skip(1)
            .map(|f| f.name().as_str())
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        if name == TIMESTAMP_FIELD {
            return None;
        }
        self.batch.column_by_name(name)
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        let array = self
            .batch
            .column(0)
            .as_any()
            .downcast_ref::<TimestampMillisecondArray>();
        array
            .map(|a| {
                a.values()
                    .iter()
                    .filter_map(|ms| Utc.timestamp_millis_opt(*ms).single())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// CSV with a header row, `timestamp` first
    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        {
            let mut writer = WriterBuilder::new().with_header(true).build(&mut buf);
            writer.write(&self.batch)?;
        }
        String::from_utf8(buf).map_err(|e| BenchError::invalid("csv", e.to_string()))
    }
}

fn timestamp_ms(record: &FlatRecord) -> Result<i64> {
    let value = record
        .get(TIMESTAMP_FIELD)
        .ok_or_else(|| BenchError::MissingField(TIMESTAMP_FIELD.to_string()))?;
    let ms = value.as_i64().ok_or_else(|| {
        BenchError::invalid(TIMESTAMP_FIELD, format!("not integer milliseconds: {}", value))
    })?;
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|_| ms)
        .ok_or_else(|| BenchError::invalid(TIMESTAMP_FIELD, format!("out of range: {}", ms)))
}

/// Pick the narrowest arrow type that holds every non-null value
fn json_column(values: &[Value]) -> ArrayRef {
    let present = || values.iter().filter(|v| !v.is_null());

    if present().next().is_some() && present().all(Value::is_boolean) {
        let mut builder = BooleanBuilder::with_capacity(values.len());
        values.iter().for_each(|v| builder.append_option(v.as_bool()));
        return Arc::new(builder.finish());
    }
    if present().next().is_some() && present().all(|v| v.as_i64().is_some()) {
        let mut builder = Int64Builder::with_capacity(values.len());
        values.iter().for_each(|v| builder.append_option(v.as_i64()));
        return Arc::new(builder.finish());
    }
    if present().next().is_some() && present().all(Value::is_number) {
        let mut builder = Float64Builder::with_capacity(values.len());
        values.iter().for_each(|v| builder.append_option(v.as_f64()));
        return Arc::new(builder.finish());
    }

    let mut builder = StringBuilder::new();
    for value in values {
        match value {
            Value::Null => builder.append_null(),
            Value::String(s) => builder.append_value(s),
            other => builder.append_value(other.to_string()),
        }
    }
    Arc::new(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use serde_json::json;

    fn flat(value: Value) -> Result<FlatRecord> {
        match value {
            Value::Object(map) => Ok(FlatRecord::from(map)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_union_of_columns_with_nulls() {
        let table = BenchmarkTable::from_records(vec![
            flat(json!({"fps": 60, "gpu": "RTX 3080", "timestamp": 1_700_000_000_000_i64})),
            flat(json!({"gpu": "RTX 4090", "vram": 24, "timestamp": 1_700_000_060_000_i64})),
        ])
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.columns(), ["fps", "gpu", "vram"]);

        let fps = table.column("fps").unwrap();
        let fps = fps.as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(fps.value(0), 60);
        assert!(fps.is_null(1));

        let gpu = table.column("gpu").unwrap();
        let gpu = gpu.as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(gpu.value(1), "RTX 4090");

        assert!(table.column("vram").unwrap().is_null(0));
        assert_eq!(table.timestamps()[0].to_rfc3339(), "2023-11-14T22:13:20+00:00");
        assert!(table.column("timestamp").is_none());
    }

    #[test]
    fn test_timestamp_column_is_utc_millis() {
        let table = BenchmarkTable::from_records(vec![flat(json!({"timestamp": 1500}))]).unwrap();
        let field = table.record_batch().schema_ref().field(0).clone();
        assert_eq!(field.name(), "timestamp");
        assert_eq!(
            field.data_type(),
            &DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
        );
    }

    #[test]
    fn test_column_types_follow_values() {
        let table = BenchmarkTable::from_records(vec![
            flat(json!({"score": 1, "ok": true, "mixed": 1, "timestamp": 1})),
            flat(json!({"score": 2.5, "ok": null, "mixed": "x", "timestamp": 2})),
        ])
        .unwrap();

        let score = table.column("score").unwrap();
        let score = score.as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(score.value(1), 2.5);
        assert_eq!(table.column("ok").unwrap().data_type(), &DataType::Boolean);

        let mixed = table.column("mixed").unwrap();
        let mixed = mixed.as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(mixed.value(0), "1");
        assert_eq!(mixed.value(1), "x");
    }

    #[test]
    fn test_first_error_aborts() {
        let result = BenchmarkTable::from_records(vec![
            flat(json!({"timestamp": 1})),
            Err(BenchError::MissingField("system_info".into())),
        ]);
        assert!(matches!(result, Err(BenchError::MissingField(_))));
    }

    #[test]
    fn test_non_integer_timestamp_rejected() {
        let result = BenchmarkTable::from_records(vec![flat(json!({"timestamp": "soon"}))]);
        assert!(matches!(result, Err(BenchError::InvalidField { .. })));
    }

    #[test]
    fn test_csv_rendering() {
        let table = BenchmarkTable::from_records(vec![flat(
            json!({"gpu": "RTX 3080, Laptop", "score": 1.5, "timestamp": 0}),
        )])
        .unwrap();
        let csv = table.to_csv_string().unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("timestamp,gpu,score"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("1970-01-01"));
        assert!(row.ends_with(",\"RTX 3080, Laptop\",1.5"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_empty() {
        let table = BenchmarkTable::from_records(Vec::<Result<FlatRecord>>::new()).unwrap();
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
        assert!(table.timestamps().is_empty());
    }
}
