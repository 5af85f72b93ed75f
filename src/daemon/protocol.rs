//! Daemon protocol: request/response types for CLI-daemon communication.

use serde::{Deserialize, Serialize};

/// Request from CLI to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command")]
pub enum Request {
    /// Execute a GraphQL query
    #[serde(rename = "query")]
    Query {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variables: Option<serde_json::Value>,
    },

    /// Start a GraphQL subscription; events stream back until disconnect
    #[serde(rename = "subscribe")]
    Subscribe { query: String },

    /// Re-read one collection file now
    #[serde(rename = "reload")]
    Reload { collection: String },

    /// Get the schema in SDL form
    #[serde(rename = "sdl")]
    Sdl,

    /// Get collection statistics
    #[serde(rename = "stats")]
    Stats,

    /// Check if daemon is alive
    #[serde(rename = "ping")]
    Ping,

    /// Shutdown the daemon
    #[serde(rename = "shutdown")]
    Shutdown,
}

/// Response from daemon to CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Response {
    /// Successful response with JSON data
    #[serde(rename = "ok")]
    Ok { data: serde_json::Value },

    /// Error response
    #[serde(rename = "error")]
    Error { message: String },

    /// One subscription result
    #[serde(rename = "event")]
    Event { data: serde_json::Value },

    /// Pong response (daemon is alive)
    #[serde(rename = "pong")]
    Pong,

    /// Shutdown acknowledgment
    #[serde(rename = "goodbye")]
    Goodbye,
}

impl Response {
    pub fn ok<T: Serialize>(data: T) -> Self {
        Response::Ok {
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Response::Error { message: msg.into() }
    }

    pub fn event<T: Serialize>(data: T) -> Self {
        Response::Event {
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }
}
