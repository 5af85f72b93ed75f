//! # CQL
//!
//! A live GraphQL API over a directory of JSON files.
//!
//! CQL reads a declarative type document and one JSON data file per
//! collection, synthesizes a GraphQL schema from them at startup, and keeps
//! results live: when a data file changes it is re-read, diffed against the
//! previous snapshot, and every added, changed, or deleted record is
//! published to subscribers.
//!
//! ## Key Features
//!
//! - **Declarative**: types come from `.schema.json`, not code
//! - **Order-free**: types may reference each other in any order, cyclically
//! - **Live**: `teamAdded` / `teamChanged` / `teamDeleted` subscriptions
//! - **Safe reloads**: a broken file never replaces the last good snapshot
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cql::{build_api, Config};
//! use std::path::Path;
//!
//! # async fn run() -> cql::Result<()> {
//! let config = Config::load(Path::new("example"))?;
//! let api = build_api(&config)?;
//!
//! let json = api.execute("{ teams { name } }").await;
//! println!("{}", json);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod daemon;
pub mod dataset;
pub mod error;
pub mod events;
pub mod graphql;
pub mod schema;
pub mod watcher;

// Re-exports for convenience
pub use config::Config;
pub use error::{CqlError, Result};

pub use dataset::{diff, DatasetLoader, Delta, Record, RecordId, ReloadSummary, Snapshot};
pub use events::{event_name, ChangeEvent, ChangeKind, ChangePublisher, EventStream};
pub use graphql::{build_api, build_schema, execute, CqlApi, CqlSchema, SchemaLimits};
pub use schema::{
    camelize, singularize, FieldType, ObjectType, ObjectTypeRegistry, ScalarType, TypeDescriptor,
    TypeDescriptorStore,
};
pub use watcher::{start_watching, WatcherHandle};
