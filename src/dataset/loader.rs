//! Dataset loader: one snapshot per collection data file.
//!
//! Discovers the data files in a directory at startup, parses each into a
//! snapshot, and re-reads a file on demand when the notifier signals a
//! change. A reload builds the new snapshot first, then swaps it in, then
//! diffs and publishes; readers never see a half-built snapshot.

use arc_swap::ArcSwap;
use ignore::WalkBuilder;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::diff::diff;
use super::record::{Record, RecordId, Snapshot};
use crate::error::{CqlError, Result};
use crate::events::ChangePublisher;
use crate::schema::{is_graphql_name, singularize};

/// Which files count as collection data.
#[derive(Debug, Clone)]
pub struct DatasetOptions {
    pub extension: String,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            extension: "json".to_string(),
        }
    }
}

/// One collection backed by one data file.
pub struct Collection {
    name: String,
    singular: String,
    path: PathBuf,
    snapshot: ArcSwap<Snapshot>,
    /// Held across read → swap → diff → publish.
    reload_lock: Mutex<()>,
}

impl Collection {
    /// File stem, e.g. `teams`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Singular form, e.g. `team`.
    pub fn singular(&self) -> &str {
        &self.singular
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }
}

/// Outcome of a successful reload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    pub collection: String,
    pub records: usize,
    pub added: usize,
    pub changed: usize,
    pub deleted: usize,
}

pub struct DatasetLoader {
    dir: PathBuf,
    collections: Vec<Collection>,
    publisher: Arc<ChangePublisher>,
}

impl DatasetLoader {
    /// Load every data file in `dir`. Any invalid file aborts the load.
    pub fn load(dir: &Path, options: &DatasetOptions, publisher: Arc<ChangePublisher>) -> Result<Self> {
        let files = discover(dir, &options.extension);
        let mut collections: Vec<Collection> = Vec::with_capacity(files.len());

        for path in files {
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            if !is_graphql_name(&name) {
                return Err(CqlError::data_load(
                    &path,
                    format!(
                        "collection name `{}` is not a valid GraphQL name (letters, digits and `_`, not starting with a digit)",
                        name
                    ),
                ));
            }
            let singular = singularize(&name);
            if let Some(other) = collections.iter().find(|c| c.singular == singular) {
                return Err(CqlError::data_load(
                    &path,
                    format!("collection `{}` has the same singular name as `{}`", name, other.name),
                ));
            }

            let snapshot = read_snapshot(&path)?;
            report_duplicates(&name, &snapshot);
            debug!(collection = %name, records = snapshot.len(), "collection loaded");

            publisher.register(&singular);
            collections.push(Collection {
                name,
                singular,
                path,
                snapshot: ArcSwap::from_pointee(snapshot),
                reload_lock: Mutex::new(()),
            });
        }

        info!(dir = %dir.display(), collections = collections.len(), "datasets loaded");
        Ok(Self {
            dir: dir.to_path_buf(),
            collections,
            publisher,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn publisher(&self) -> &Arc<ChangePublisher> {
        &self.publisher
    }

    /// Collections in file-name order.
    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.iter()
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Collection whose singular name is `type_name` (a declared entity name).
    pub fn collection_for_type(&self, type_name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.singular == type_name)
    }

    /// Collection backed by the file at `path`, matched by file name.
    pub fn collection_for_path(&self, path: &Path) -> Option<&Collection> {
        let file_name = path.file_name()?;
        self.collections
            .iter()
            .find(|c| c.path.file_name() == Some(file_name))
    }

    /// Current snapshot of a collection. Never touches the file system.
    pub fn snapshot(&self, name: &str) -> Option<Arc<Snapshot>> {
        self.collection(name).map(Collection::snapshot)
    }

    /// Record of the collection holding `type_name` entities, by id.
    pub fn find_record(&self, type_name: &str, id: &RecordId) -> Option<Record> {
        let snapshot = self.collection_for_type(type_name)?.snapshot();
        snapshot.find(id).cloned()
    }

    /// Re-read a collection's file, swap in the new snapshot, and publish
    /// the delta. On failure the previous snapshot stays in place.
    pub fn reload(&self, name: &str) -> Result<ReloadSummary> {
        let collection = self
            .collection(name)
            .ok_or_else(|| CqlError::UnknownCollection(name.to_string()))?;
        self.reload_collection(collection)
    }

    /// Notifier entry point. Paths that are not collection files are ignored.
    pub fn reload_path(&self, path: &Path) -> Result<Option<ReloadSummary>> {
        match self.collection_for_path(path) {
            Some(collection) => self.reload_collection(collection).map(Some),
            None => {
                debug!(path = %path.display(), "not a collection file, ignoring");
                Ok(None)
            }
        }
    }

    fn reload_collection(&self, collection: &Collection) -> Result<ReloadSummary> {
        let _guard = collection
            .reload_lock
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let next = match read_snapshot(&collection.path) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                warn!(collection = %collection.name, error = %e, "reload failed, keeping previous snapshot");
                return Err(e);
            }
        };
        report_duplicates(&collection.name, &next);

        let previous = collection.snapshot.swap(Arc::clone(&next));
        let delta = diff(previous.records(), next.records());
        let summary = ReloadSummary {
            collection: collection.name.clone(),
            records: next.len(),
            added: delta.added.len(),
            changed: delta.changed.len(),
            deleted: delta.deleted.len(),
        };

        if !delta.is_empty() {
            self.publisher.publish(&collection.singular, delta)?;
        }

        info!(
            collection = %summary.collection,
            records = summary.records,
            added = summary.added,
            changed = summary.changed,
            deleted = summary.deleted,
            "collection reloaded"
        );
        Ok(summary)
    }
}

/// Non-hidden files directly inside `dir` with the given extension, sorted.
fn discover(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkBuilder::new(dir)
        .max_depth(Some(1))
        .hidden(true) // skips .schema.json and friends
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map_or(false, |ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().map_or(false, |ext| ext == extension))
        .collect();
    files.sort();
    files
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let text = fs::read_to_string(path).map_err(|e| CqlError::data_load(path, e))?;
    Snapshot::parse(path, &text)
}

fn report_duplicates(collection: &str, snapshot: &Snapshot) {
    for id in snapshot.duplicate_ids() {
        warn!(collection, %id, "duplicate record id, last occurrence wins");
    }
}
