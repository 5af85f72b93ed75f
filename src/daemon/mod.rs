//! Daemon module: background process serving the live GraphQL API.
//!
//! The daemon keeps every collection snapshot in memory, watches the data
//! files for changes, and serves queries and subscriptions over a Unix
//! socket.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           cql daemon                    │
//! │  - schema + snapshots in memory         │
//! │  - file watcher (reload → diff → publish)│
//! │  - Unix socket server                   │
//! └─────────────────────────────────────────┘
//!           ▲
//!           │ .cql/cql.sock
//!           ▼
//! ┌─────────────────────────────────────────┐
//! │           cql CLI                       │
//! │  - connects to daemon                   │
//! │  - sends JSON requests                  │
//! │  - receives JSON responses / events     │
//! └─────────────────────────────────────────┘
//! ```

pub mod protocol;
pub mod server;

pub use protocol::{Request, Response};
pub use server::{is_daemon_running, send_request, socket_path, start_daemon, subscribe};
