//! Reconciliation between a local record set and the remote catalog.
//!
//! One pass:
//! 1. list the remote set and collect its ids
//! 2. split local records into creates (id unknown remotely) and updates
//! 3. issue creates, then updates; the first failure aborts the rest
//! 4. re-fetch the remote set, which becomes the new local state
//!
//! Remote records missing locally are never touched: deletes are explicit and
//! never inferred from a diff. A reconciler runs at most one pass at a time;
//! a second request while one is running is rejected, not queued.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::domain::PriceItem;
use crate::services::remote::{RemoteCatalog, RemoteError};
use crate::services::store::StoreError;

/// A record that can be matched against the remote catalog by id.
pub trait SyncRecord: Clone + Send + Sync + 'static {
    fn record_id(&self) -> &str;
    fn set_record_id(&mut self, id: String);
}

impl SyncRecord for PriceItem {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn set_record_id(&mut self, id: String) {
        self.id = id;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Create,
    Update,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("A sync pass is already in progress")]
    InProgress,

    #[error("Failed to fetch remote records: {0}")]
    Fetch(#[source] RemoteError),

    #[error("Partial sync aborted during {phase} after {completed} of {attempted} requests: {source}")]
    Partial {
        phase: SyncPhase,
        completed: usize,
        attempted: usize,
        #[source]
        source: RemoteError,
    },

    #[error("Failed to persist synced snapshot: {0}")]
    Storage(#[from] StoreError),
}

/// Server id handed out for a record that only existed locally
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IdAssignment {
    pub local_id: String,
    pub remote_id: String,
}

/// Summary of a successful pass
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    /// Remote records with no local counterpart, left alone
    pub untouched_remote: usize,
    /// Records in the local table after the pass
    pub total: usize,
    /// False when the final re-fetch failed and the patched working copy was kept
    pub refetched: bool,
    pub assigned_ids: Vec<IdAssignment>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SyncOutcome {
    Success { report: SyncReport },
    Failure { message: String, at: DateTime<Utc> },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncState {
    Idle { last: Option<SyncOutcome> },
    Syncing { started_at: DateTime<Utc> },
}

impl Default for SyncState {
    fn default() -> Self {
        Self::Idle { last: None }
    }
}

/// Local records split by whether the remote already knows their id.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan<T> {
    pub to_create: Vec<T>,
    pub to_update: Vec<T>,
    pub untouched_remote: usize,
}

impl<T: SyncRecord> SyncPlan<T> {
    pub fn build(local: &[T], remote: &[T]) -> Self {
        let remote_ids: HashSet<&str> = remote.iter().map(SyncRecord::record_id).collect();
        let local_ids: HashSet<&str> = local.iter().map(SyncRecord::record_id).collect();

        let (to_update, to_create): (Vec<T>, Vec<T>) = local
            .iter()
            .cloned()
            .partition(|record| remote_ids.contains(record.record_id()));

        let untouched_remote = remote_ids.difference(&local_ids).count();

        Self {
            to_create,
            to_update,
            untouched_remote,
        }
    }
}

/// Proof that a pass is running. Dropping it without reporting an outcome
/// returns the reconciler to `Idle` with a failure.
pub struct SyncPass {
    state: Arc<Mutex<SyncState>>,
    done: bool,
}

impl SyncPass {
    pub fn succeed(mut self, report: SyncReport) {
        *self.state.lock() = SyncState::Idle {
            last: Some(SyncOutcome::Success { report }),
        };
        self.done = true;
    }

    pub fn fail(mut self, message: impl Into<String>) {
        *self.state.lock() = SyncState::Idle {
            last: Some(SyncOutcome::Failure {
                message: message.into(),
                at: Utc::now(),
            }),
        };
        self.done = true;
    }
}

impl Drop for SyncPass {
    fn drop(&mut self) {
        if !self.done {
            *self.state.lock() = SyncState::Idle {
                last: Some(SyncOutcome::Failure {
                    message: "sync pass abandoned".to_string(),
                    at: Utc::now(),
                }),
            };
        }
    }
}

pub struct SyncReconciler<T> {
    remote: Arc<dyn RemoteCatalog<T>>,
    state: Arc<Mutex<SyncState>>,
}

impl<T: SyncRecord> SyncReconciler<T> {
    pub fn new(remote: Arc<dyn RemoteCatalog<T>>) -> Self {
        Self {
            remote,
            state: Arc::new(Mutex::new(SyncState::default())),
        }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteCatalog<T>> {
        &self.remote
    }

    pub fn state(&self) -> SyncState {
        self.state.lock().clone()
    }

    pub fn is_syncing(&self) -> bool {
        matches!(*self.state.lock(), SyncState::Syncing { .. })
    }

    /// Move `Idle → Syncing`, or refuse if a pass is already running.
    pub fn try_begin(&self) -> Result<SyncPass, SyncError> {
        let mut state = self.state.lock();
        if matches!(*state, SyncState::Syncing { .. }) {
            return Err(SyncError::InProgress);
        }
        *state = SyncState::Syncing {
            started_at: Utc::now(),
        };
        Ok(SyncPass {
            state: self.state.clone(),
            done: false,
        })
    }

    /// Run the remote half of a pass against a snapshot of local records and
    /// return the records the local table should hold afterwards.
    ///
    /// Nothing local is touched here; on error the caller keeps its state.
    /// Server ids from create responses are patched onto the working copy as
    /// they arrive, so if the closing re-fetch fails the working copy is still
    /// a faithful post-pass state.
    #[instrument(skip(self, local), fields(local = local.len()))]
    pub async fn reconcile(&self, local: Vec<T>) -> Result<(Vec<T>, SyncReport), SyncError> {
        let remote = self.remote.list().await.map_err(SyncError::Fetch)?;
        let plan = SyncPlan::build(&local, &remote);

        info!(
            to_create = plan.to_create.len(),
            to_update = plan.to_update.len(),
            untouched_remote = plan.untouched_remote,
            "Sync plan built"
        );

        let mut working = local;
        let mut assigned_ids = Vec::with_capacity(plan.to_create.len());

        let attempted = plan.to_create.len();
        for (completed, record) in plan.to_create.iter().enumerate() {
            let created = self.remote.create(record).await.map_err(|source| {
                warn!(id = record.record_id(), error = %source, "Create failed, aborting pass");
                SyncError::Partial {
                    phase: SyncPhase::Create,
                    completed,
                    attempted,
                    source,
                }
            })?;

            let assigned = created.record_id().to_string();
            if let Some(slot) = working
                .iter_mut()
                .find(|r| r.record_id() == record.record_id())
            {
                slot.set_record_id(assigned.clone());
            }
            assigned_ids.push(IdAssignment {
                local_id: record.record_id().to_string(),
                remote_id: assigned,
            });
        }

        let attempted = plan.to_update.len();
        for (completed, record) in plan.to_update.iter().enumerate() {
            self.remote
                .update(record.record_id(), record)
                .await
                .map_err(|source| {
                    warn!(id = record.record_id(), error = %source, "Update failed, aborting pass");
                    SyncError::Partial {
                        phase: SyncPhase::Update,
                        completed,
                        attempted,
                        source,
                    }
                })?;
        }

        let (records, refetched) = match self.remote.list().await {
            Ok(fresh) => (fresh, true),
            Err(e) => {
                warn!(error = %e, "Re-fetch after sync failed, keeping patched working copy");
                (working, false)
            }
        };

        let report = SyncReport {
            created: plan.to_create.len(),
            updated: plan.to_update.len(),
            untouched_remote: plan.untouched_remote,
            total: records.len(),
            refetched,
            assigned_ids,
            finished_at: Utc::now(),
        };

        Ok((records, report))
    }
}
