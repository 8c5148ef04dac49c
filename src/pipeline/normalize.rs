use serde::Serialize;
use serde_json::{Map, Value};

use crate::constants::{SYSTEM_INFO_FIELD, TIMESTAMP_FIELD};
use crate::error::{BenchError, Result};
use crate::metrics::RecordMetrics;
use crate::types::RawRecord;

/// Single-level mapping built from a record's payload, its `system_info`
/// object and its timestamp. Fields keep the order they first appeared in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FlatRecord {
    fields: Map<String, Value>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `other` into this record. On a key collision the value from
    /// `other` replaces the existing one but keeps its position.
    pub fn merge<I>(&mut self, other: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (key, value) in other {
            self.fields.insert(key, value);
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Raw epoch milliseconds, as merged by the normalizer
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.fields.get(TIMESTAMP_FIELD).and_then(Value::as_i64)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for FlatRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Flatten one record: payload fields, then `system_info` fields (winning
/// on collision), then `timestamp`.
pub fn normalize_record(raw: &RawRecord) -> Result<FlatRecord> {
    let payload: Value = serde_json::from_str(&raw.data)?;
    let Value::Object(data) = payload else {
        return Err(BenchError::invalid("data", "payload is not a JSON object"));
    };

    let system = match data.get(SYSTEM_INFO_FIELD) {
        Some(Value::Object(system)) => system.clone(),
        Some(_) => return Err(BenchError::invalid(SYSTEM_INFO_FIELD, "not a JSON object")),
        None => return Err(BenchError::MissingField(SYSTEM_INFO_FIELD.to_string())),
    };

    let mut flat = FlatRecord::new();
    flat.merge(data.into_iter().filter(|(key, _)| key != SYSTEM_INFO_FIELD));
    flat.merge(system);
    flat.insert(TIMESTAMP_FIELD, Value::from(raw.timestamp));

    RecordMetrics::record_normalized();
    Ok(flat)
}

/// Maps a raw record stream to flat records, one for one and in order.
/// Upstream errors pass through untouched.
pub struct RecordNormalizer<I> {
    inner: I,
}

impl<I> RecordNormalizer<I>
where
    I: Iterator<Item = Result<RawRecord>>,
{
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

impl<I> Iterator for RecordNormalizer<I>
where
    I: Iterator<Item = Result<RawRecord>>,
{
    type Item = Result<FlatRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|raw| raw.and_then(|raw| normalize_record(&raw)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
