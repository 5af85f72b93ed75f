//! Snapshot differ.
//!
//! Partitions two snapshots of one collection into added, changed, and
//! deleted records, keyed by `id`. Records are compared structurally
//! (`serde_json::Value` equality), so key order inside a record never
//! registers as a change.

use std::collections::HashMap;
use tracing::debug;

use super::record::{Record, RecordId};

/// Added/changed/deleted partition between two snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    /// In new-snapshot order.
    pub added: Vec<Record>,
    /// New values, in new-snapshot order.
    pub changed: Vec<Record>,
    /// Old values, in old-snapshot order.
    pub deleted: Vec<Record>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.deleted.is_empty()
    }

    /// Total number of affected records.
    pub fn len(&self) -> usize {
        self.added.len() + self.changed.len() + self.deleted.len()
    }
}

/// Records by id plus first-occurrence order.
struct Index<'a> {
    by_id: HashMap<&'a RecordId, &'a Record>,
    order: Vec<&'a RecordId>,
}

impl<'a> Index<'a> {
    /// Last write wins; a repeated id keeps its first position.
    fn build(records: &'a [Record]) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        let mut order = Vec::with_capacity(records.len());
        for record in records {
            if by_id.insert(record.id(), record).is_none() {
                order.push(record.id());
            } else {
                debug!(id = %record.id(), "repeated record id, keeping last occurrence");
            }
        }
        Self { by_id, order }
    }

    fn get(&self, id: &RecordId) -> Option<&'a Record> {
        self.by_id.get(id).copied()
    }
}

/// Compute the delta from `old` to `new`.
pub fn diff(old: &[Record], new: &[Record]) -> Delta {
    let old_index = Index::build(old);
    let new_index = Index::build(new);
    let mut delta = Delta::default();

    for id in &new_index.order {
        let Some(current) = new_index.get(id) else {
            continue;
        };
        match old_index.get(id) {
            None => delta.added.push(current.clone()),
            Some(previous) if previous != current => delta.changed.push(current.clone()),
            Some(_) => {}
        }
    }

    for id in &old_index.order {
        if new_index.get(id).is_none() {
            if let Some(previous) = old_index.get(id) {
                delta.deleted.push(previous.clone());
            }
        }
    }

    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::HashSet;

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| Record::from_value(v.clone()).unwrap())
            .collect()
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.id().as_str()).collect()
    }

    #[test]
    fn test_identical_snapshots() {
        let a = records(json!([{"id":"1","name":"Red"},{"id":"2","name":"Blue"}]));
        assert!(diff(&a, &a).is_empty());
        assert!(diff(&[], &[]).is_empty());
    }

    #[test]
    fn test_changed_and_added() {
        let old = records(json!([{"id":"1","name":"Red"}]));
        let new = records(json!([{"id":"1","name":"Blue"},{"id":"2","name":"Green"}]));
        let delta = diff(&old, &new);
        assert_eq!(ids(&delta.added), vec!["2"]);
        assert_eq!(ids(&delta.changed), vec!["1"]);
        assert_eq!(delta.changed[0].get("name"), Some(&json!("Blue")));
        assert!(delta.deleted.is_empty());
        assert_eq!(delta.len(), 2);
    }

    #[test]
    fn test_deleted() {
        let old = records(json!([{"id":"1"},{"id":"2"}]));
        let new = records(json!([{"id":"2"}]));
        let delta = diff(&old, &new);
        assert!(delta.added.is_empty());
        assert!(delta.changed.is_empty());
        assert_eq!(ids(&delta.deleted), vec!["1"]);
    }

    #[test]
    fn test_key_order_is_not_a_change() {
        let old = records(json!([{"id":"1","a":1,"b":{"x":1,"y":2}}]));
        let new: Vec<Record> = vec![Record::from_value(
            serde_json::from_str(r#"{"b":{"y":2,"x":1},"a":1,"id":"1"}"#).unwrap(),
        )
        .unwrap()];
        assert!(diff(&old, &new).is_empty());
    }

    #[test]
    fn test_nested_change_detected() {
        let old = records(json!([{"id":"1","tags":["a","b"]}]));
        let new = records(json!([{"id":"1","tags":["b","a"]}]));
        assert_eq!(ids(&diff(&old, &new).changed), vec!["1"]);
    }

    #[test]
    fn test_ordering_follows_snapshots() {
        let old = records(json!([{"id":"a"},{"id":"b"},{"id":"c"},{"id":"d"}]));
        let new = records(json!([{"id":"z"},{"id":"c"},{"id":"y"},{"id":"a"}]));
        let delta = diff(&old, &new);
        assert_eq!(ids(&delta.added), vec!["z", "y"]);
        assert_eq!(ids(&delta.deleted), vec!["b", "d"]);
    }

    #[test]
    fn test_duplicate_ids_last_write_wins() {
        let old = records(json!([{"id":"1","v":1}]));
        let new = records(json!([{"id":"1","v":2},{"id":"2"},{"id":"1","v":1}]));
        // Last occurrence of "1" equals the old record.
        let delta = diff(&old, &new);
        assert!(delta.changed.is_empty());
        assert_eq!(ids(&delta.added), vec!["2"]);

        let new = records(json!([{"id":"1","v":1},{"id":"1","v":5}]));
        let delta = diff(&old, &new);
        assert_eq!(delta.changed.len(), 1);
        assert_eq!(delta.changed[0].get("v"), Some(&json!(5)));
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let old = records(json!([
            {"id":"1","v":1},{"id":"2","v":2},{"id":"3","v":3},{"id":"4","v":4}
        ]));
        let new = records(json!([
            {"id":"2","v":2},{"id":"3","v":30},{"id":"5","v":5},{"id":"6","v":6}
        ]));
        let delta = diff(&old, &new);

        let added: HashSet<&str> = ids(&delta.added).into_iter().collect();
        let changed: HashSet<&str> = ids(&delta.changed).into_iter().collect();
        let deleted: HashSet<&str> = ids(&delta.deleted).into_iter().collect();

        assert!(added.is_disjoint(&changed));
        assert!(added.is_disjoint(&deleted));
        assert!(changed.is_disjoint(&deleted));

        let all: HashSet<&str> = ["1", "2", "3", "4", "5", "6"].into_iter().collect();
        for id in all {
            let hits = [&added, &changed, &deleted].iter().filter(|s| s.contains(id)).count();
            let expected = if id == "2" { 0 } else { 1 };
            assert_eq!(hits, expected, "id {} accounted {} times", id, hits);
        }
    }
}
