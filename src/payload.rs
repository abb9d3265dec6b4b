//! Metric normalization and payload coalescing.
//!
//! Samplers produce structured [`MetricRecord`]s; [`flatten`] turns each one
//! into namespaced flat keys, and the [`PayloadAggregator`] accumulates those
//! entries across scheduler ticks until the dispatcher flushes them as one
//! outbound message.

use std::collections::BTreeMap;

use serde_json::Value;

/// A named structured sample: a record-type name plus numeric fields.
#[derive(Debug, Clone)]
pub struct MetricRecord {
    pub name: &'static str,
    pub fields: BTreeMap<String, f64>,
}

impl MetricRecord {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, key: &str, value: f64) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}

/// Flattens a record into `{record}_{field}` entries.
///
/// The record-type prefix keeps fields from different record types from
/// colliding even when their field names coincide.
pub fn flatten(record: &MetricRecord) -> BTreeMap<String, Value> {
    record
        .fields
        .iter()
        .map(|(field, value)| (format!("{}_{}", record.name, field), number(*value)))
        .collect()
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Accumulates normalized entries from every sampler into one mutable
/// outbound snapshot, flushed and cleared as a unit.
///
/// Created once and reused for the life of the process; only the tick task
/// mutates it.
#[derive(Debug, Default)]
pub struct PayloadAggregator {
    snapshot: BTreeMap<String, Value>,
}

impl PayloadAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites entries, last writer wins per key.
    pub fn merge(&mut self, entries: BTreeMap<String, Value>) {
        self.snapshot.extend(entries);
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Takes the current snapshot and resets it to empty.
    ///
    /// There is no retry buffer: once taken, a failed dispatch loses this
    /// cycle's data. That trade-off is deliberate.
    pub fn flush(&mut self) -> BTreeMap<String, Value> {
        std::mem::take(&mut self.snapshot)
    }
}
