//! File watcher module: turns data file edits into collection reloads.
//!
//! Watches the data directory and signals the dataset loader whenever a
//! collection file may have new content. The loader does the rest
//! (re-read, swap, diff, publish).

use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::dataset::DatasetLoader;

/// Default debounce duration for file events.
const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Start watching the loader's data directory.
///
/// Returns a handle that keeps the watcher alive. Drop it to stop watching.
///
/// # Arguments
/// * `loader` - Loader whose collections are reloaded on change
/// * `debounce_ms` - Debounce duration in milliseconds (0 = use default 200ms)
pub fn start_watching(
    loader: Arc<DatasetLoader>,
    debounce_ms: u64,
) -> Result<WatcherHandle, notify::Error> {
    let debounce = if debounce_ms == 0 {
        Duration::from_millis(DEFAULT_DEBOUNCE_MS)
    } else {
        Duration::from_millis(debounce_ms)
    };

    let dir = loader.dir().to_path_buf();
    let target = Arc::clone(&loader);

    let mut debouncer = new_debouncer(
        debounce,
        move |result: Result<Vec<DebouncedEvent>, notify::Error>| match result {
            Ok(events) => handle_events(&events, &target),
            Err(e) => warn!(error = %e, "file watcher error"),
        },
    )?;

    debouncer
        .watcher()
        .watch(&dir, notify::RecursiveMode::NonRecursive)?;

    info!(dir = %dir.display(), debounce_ms = debounce.as_millis() as u64, "file watcher started");

    Ok(WatcherHandle {
        _debouncer: debouncer,
    })
}

/// Handle debounced file events.
///
/// Runs on the debouncer's thread, one batch at a time.
pub(crate) fn handle_events(events: &[DebouncedEvent], loader: &DatasetLoader) {
    // Deduplicate: one signal per path, last event kind wins
    let mut paths: HashMap<&Path, DebouncedEventKind> = HashMap::new();
    for event in events {
        if loader.collection_for_path(&event.path).is_none() {
            continue;
        }
        paths.insert(event.path.as_path(), event.kind);
    }

    if paths.is_empty() {
        return;
    }

    debug!(count = paths.len(), "processing file events");

    for (path, kind) in paths {
        match kind {
            DebouncedEventKind::Any => signal(path, loader),
            DebouncedEventKind::AnyContinuous => {
                // Ongoing writes, skip until settled
                debug!(file = %path.display(), "skipping continuous write");
            }
            _ => {
                debug!(file = %path.display(), "unhandled event kind");
            }
        }
    }
}

fn signal(path: &Path, loader: &DatasetLoader) {
    if !path.exists() {
        warn!(file = %path.display(), "data file removed, serving last snapshot");
        return;
    }
    // Failures are logged by the loader; the previous snapshot stays live.
    if let Err(e) = loader.reload_path(path) {
        debug!(file = %path.display(), error = %e, "reload skipped");
    }
}

/// Handle that keeps the file watcher alive.
/// Drop this to stop watching.
pub struct WatcherHandle {
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
}
