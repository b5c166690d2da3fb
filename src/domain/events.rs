use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of events surfaced to subscribers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
    SyncComplete,
    SyncFailed,
    LoadFailed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::SyncComplete => "sync-complete",
            Self::SyncFailed => "sync-failed",
            Self::LoadFailed => "load-failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineEvent {
    pub kind: EventKind,
    /// Table the event concerns, e.g. `price_items`
    pub source: String,
    pub detail: String,
    pub at: DateTime<Utc>,
}
