//! Records and the per-record transformer.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::registry::HandlerRegistry;
use crate::error::HandlerError;

/// One row of the source: column names (shared with every other row) and
/// the row's values in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl Record {
    /// Build a record from positional values.
    ///
    /// Missing trailing values are filled with empty strings; surplus values
    /// are the caller's concern and are dropped here.
    pub fn new(columns: Arc<[String]>, mut values: Vec<String>) -> Self {
        values.resize(columns.len(), String::new());
        Self { columns, values }
    }

    /// Build a record from `(column, value)` pairs, in order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<String>) =
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i].as_str())
    }

    /// `(column, value)` pairs in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// A handler failed on one field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldFault {
    pub column: String,
    pub value: String,
    pub message: String,
}

/// Result of transforming one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Every field was visited; write this record.
    Transformed(Record),
    /// A handler asked for the whole record to be dropped.
    Skipped { column: String },
    /// A handler failed; the record is dropped and the fault reported.
    Fault(FieldFault),
}

/// Applies a [`HandlerRegistry`] to whole records.
#[derive(Debug, Clone, Copy)]
pub struct RecordTransformer<'r> {
    registry: &'r HandlerRegistry,
}

impl<'r> RecordTransformer<'r> {
    pub fn new(registry: &'r HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Transform every field in stored order.
    ///
    /// Columns without a handler keep their raw value. The first skip or
    /// fault stops processing and the partially transformed record is
    /// discarded.
    pub fn apply(&self, mut record: Record) -> RecordOutcome {
        for i in 0..record.values.len() {
            let Some(handler) = self.registry.resolve(&record.columns[i]) else {
                continue;
            };

            match handler.call(&record.values[i]) {
                Ok(value) => record.values[i] = value,
                Err(HandlerError::Skip) => {
                    return RecordOutcome::Skipped {
                        column: record.columns[i].clone(),
                    };
                }
                Err(HandlerError::Fault(message)) => {
                    return RecordOutcome::Fault(FieldFault {
                        column: record.columns[i].clone(),
                        value: std::mem::take(&mut record.values[i]),
                        message,
                    });
                }
            }
        }

        RecordOutcome::Transformed(record)
    }
}
