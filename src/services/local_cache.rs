//! Typed handle over one table's snapshot.

use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::EventKind;
use crate::services::events::EventBus;
use crate::services::store::{SnapshotStore, StoreError};

/// A logical table: one key in a [`SnapshotStore`] holding a JSON array of `T`.
pub struct LocalCache<T> {
    store: Arc<dyn SnapshotStore>,
    key: String,
    table: String,
    events: EventBus,
    _records: PhantomData<fn() -> T>,
}

impl<T> Clone for LocalCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key.clone(),
            table: self.table.clone(),
            events: self.events.clone(),
            _records: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> LocalCache<T> {
    pub fn new(store: Arc<dyn SnapshotStore>, key: impl Into<String>, events: EventBus) -> Self {
        let key = key.into();
        let table = key.rsplit(':').next().unwrap_or(&key).to_string();
        Self {
            store,
            key,
            table,
            events,
            _records: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Table name used in events and logs, e.g. `price_items`.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Load the snapshot. A missing snapshot is an empty table; an unreadable
    /// or malformed one is logged and also treated as empty.
    pub async fn read(&self) -> Vec<T> {
        let raw = match self.store.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "No snapshot yet");
                return Vec::new();
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read snapshot, starting empty");
                self.events
                    .publish(EventKind::LoadFailed, &self.table, e.to_string());
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(records) => {
                debug!(key = %self.key, count = records.len(), "Snapshot loaded");
                records
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Malformed snapshot, starting empty");
                self.events.publish(
                    EventKind::LoadFailed,
                    &self.table,
                    format!("malformed snapshot: {}", e),
                );
                Vec::new()
            }
        }
    }

    /// Replace the whole snapshot.
    pub async fn write(&self, records: &[T]) -> Result<(), StoreError> {
        let (key, value) = self.encode(records)?;
        self.store.set(&key, value).await
    }

    /// Replace this snapshot together with other already-encoded snapshots as
    /// one unit.
    pub async fn write_with(
        &self,
        records: &[T],
        others: Vec<(String, String)>,
    ) -> Result<(), StoreError> {
        let mut entries = Vec::with_capacity(others.len() + 1);
        entries.push(self.encode(records)?);
        entries.extend(others);
        self.store.set_many(entries).await
    }

    /// Serialize a full snapshot without writing it.
    pub fn encode(&self, records: &[T]) -> Result<(String, String), StoreError> {
        let value = serde_json::to_string(records)?;
        Ok((self.key.clone(), value))
    }
}
