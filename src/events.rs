//! Change publisher.
//!
//! Turns a [`Delta`] into typed [`ChangeEvent`]s and fans them out per
//! collection and change kind. Every subscriber owns an unbounded queue, so
//! a reload of any size reaches each attached subscriber in full. Delivery
//! is at-most-once: a subscriber only sees events published while it is
//! attached, and nothing is replayed.

use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, trace};

use crate::dataset::{Delta, Record};
use crate::error::{CqlError, Result};
use crate::schema::camelize_lower;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Changed,
    Deleted,
}

impl ChangeKind {
    /// Publication order within one reload.
    pub const ALL: [ChangeKind; 3] = [ChangeKind::Added, ChangeKind::Changed, ChangeKind::Deleted];

    pub fn suffix(self) -> &'static str {
        match self {
            ChangeKind::Added => "Added",
            ChangeKind::Changed => "Changed",
            ChangeKind::Deleted => "Deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => f.write_str("added"),
            ChangeKind::Changed => f.write_str("changed"),
            ChangeKind::Deleted => f.write_str("deleted"),
        }
    }
}

/// Subscription field name for a collection and kind: `teamAdded`.
pub fn event_name(singular: &str, kind: ChangeKind) -> String {
    format!("{}{}", camelize_lower(singular), kind.suffix())
}

/// One affected record from one reload.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Singular collection name.
    pub collection: String,
    pub kind: ChangeKind,
    pub record: Record,
}

impl ChangeEvent {
    pub fn name(&self) -> String {
        event_name(&self.collection, self.kind)
    }
}

/// Endless stream of events from one channel. Ends only when dropped.
pub type EventStream = BoxStream<'static, ChangeEvent>;

type ChannelKey = (String, ChangeKind);

/// Subscriber queues per collection and kind.
#[derive(Default)]
pub struct ChangePublisher {
    channels: RwLock<HashMap<ChannelKey, Vec<UnboundedSender<ChangeEvent>>>>,
}

impl ChangePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the three channels for a collection. Idempotent.
    pub fn register(&self, singular: &str) {
        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
        for kind in ChangeKind::ALL {
            channels.entry((singular.to_string(), kind)).or_default();
        }
        debug!(collection = singular, "change channels registered");
    }

    pub fn is_registered(&self, singular: &str) -> bool {
        let channels = self.channels.read().unwrap_or_else(|e| e.into_inner());
        channels.contains_key(&(singular.to_string(), ChangeKind::Added))
    }

    /// Emit one event per record: all added, then changed, then deleted.
    ///
    /// Returns the number of events emitted, whether or not anyone was
    /// listening. Subscribers whose stream was dropped are pruned here.
    pub fn publish(&self, singular: &str, delta: Delta) -> Result<usize> {
        let Delta {
            added,
            changed,
            deleted,
        } = delta;
        let mut emitted = 0;
        let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());

        for (kind, records) in [
            (ChangeKind::Added, added),
            (ChangeKind::Changed, changed),
            (ChangeKind::Deleted, deleted),
        ] {
            if records.is_empty() {
                continue;
            }
            let subscribers = channels
                .get_mut(&(singular.to_string(), kind))
                .ok_or_else(|| CqlError::UnknownCollection(singular.to_string()))?;
            subscribers.retain(|tx| !tx.is_closed());

            for record in records {
                let id = record.id().clone();
                let event = ChangeEvent {
                    collection: singular.to_string(),
                    kind,
                    record,
                };
                // A failed send means that subscriber went away mid-publish.
                subscribers.retain(|tx| tx.send(event.clone()).is_ok());
                trace!(collection = singular, %kind, %id, receivers = subscribers.len(), "event sent");
                emitted += 1;
            }
        }

        Ok(emitted)
    }

    /// Attach to one channel. Only events published after this call are seen.
    pub fn subscribe(&self, singular: &str, kind: ChangeKind) -> Result<EventStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
            channels
                .get_mut(&(singular.to_string(), kind))
                .ok_or_else(|| CqlError::UnknownCollection(singular.to_string()))?
                .push(tx);
        }

        let events = stream::unfold(rx, |mut rx| async move {
            let event = rx.recv().await?;
            Some((event, rx))
        });

        Ok(events.boxed())
    }

    /// Number of attached subscribers on one channel.
    pub fn subscriber_count(&self, singular: &str, kind: ChangeKind) -> usize {
        let channels = self.channels.read().unwrap_or_else(|e| e.into_inner());
        channels
            .get(&(singular.to_string(), kind))
            .map_or(0, |subscribers| subscribers.iter().filter(|tx| !tx.is_closed()).count())
    }
}
