//! Records and collection snapshots.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::{CqlError, Result};

/// Canonical record identity: the `id` attribute as a string.
///
/// String ids are kept verbatim; integer ids use their decimal form, so
/// `1` and `"1"` name the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RecordId(s.clone())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(RecordId(n.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

/// One JSON object from a data file. Always carries an `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    fields: Map<String, Value>,
}

impl Record {
    /// Wrap a JSON object; `None` unless it is an object with a usable `id`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => {
                let id = fields.get("id").and_then(RecordId::from_value)?;
                Some(Record { id, fields })
            }
            _ => None,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Full state of one collection at a point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    records: Vec<Record>,
}

impl Snapshot {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Parse a data file's contents: a JSON array of objects with ids.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| CqlError::data_load(path, e))?;
        let items = match value {
            Value::Array(items) => items,
            _ => return Err(CqlError::data_load(path, "expected a JSON array of records")),
        };

        let records = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                Record::from_value(item).ok_or_else(|| {
                    CqlError::data_load(
                        path,
                        format!("record {} is not an object with a string or integer `id`", index),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record with this id; the last one wins when ids repeat.
    pub fn find(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().rev().find(|r| r.id() == id)
    }

    /// Ids that occur more than once, in order of their second occurrence.
    pub fn duplicate_ids(&self) -> Vec<&RecordId> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        self.records
            .iter()
            .map(Record::id)
            .filter(|id| !seen.insert(*id) && reported.insert(*id))
            .collect()
    }
}
