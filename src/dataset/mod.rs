//! Collection data: records, snapshots, loading, and diffing.

pub mod diff;
pub mod loader;
pub mod record;

pub use diff::{diff, Delta};
pub use loader::{Collection, DatasetLoader, DatasetOptions, ReloadSummary};
pub use record::{Record, RecordId, Snapshot};
