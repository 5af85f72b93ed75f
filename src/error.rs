//! Error types for CQL.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CqlError>;

/// Everything that can go wrong while building or serving the API.
#[derive(Debug, Error)]
pub enum CqlError {
    /// Malformed type descriptor document.
    #[error("invalid type descriptor `{name}`: {reason}")]
    Descriptor { name: String, reason: String },

    /// A field names a type that is neither a scalar nor a declared entity.
    #[error("field `{entity}.{field}` references unknown type `{type_name}`")]
    UnresolvedFieldType {
        entity: String,
        field: String,
        type_name: String,
    },

    /// A data file could not be read or is not an array of records.
    #[error("failed to load {}: {reason}", path.display())]
    DataLoad { path: PathBuf, reason: String },

    /// No collection with this name was loaded.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// A collection's singular name has no matching object type.
    #[error("collection `{collection}` has no object type named `{type_name}`")]
    UnknownCollectionType {
        collection: String,
        type_name: String,
    },

    /// The GraphQL engine rejected the synthesized schema.
    #[error("schema build failed: {0}")]
    Schema(String),

    /// Invalid configuration file.
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CqlError {
    pub(crate) fn descriptor(name: impl Into<String>, reason: impl Into<String>) -> Self {
        CqlError::Descriptor {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn data_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CqlError::DataLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
