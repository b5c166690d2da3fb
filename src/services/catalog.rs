//! Price item catalog: local table, edit session and reconciliation.
//!
//! Every mutation builds the next record set, writes it to the snapshot and
//! only then swaps it in, so a failed write leaves the table untouched. While
//! a sync pass runs, all local mutations are refused.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::domain::{DraftPatch, EventKind, PriceItem, PriceItemInput};
use crate::error::{ApiError, ApiResult};
use crate::services::editor::{EditSession, EditState};
use crate::services::events::EventBus;
use crate::services::local_cache::LocalCache;
use crate::services::remote::{RemoteCatalog, RemoteError};
use crate::services::sync::{SyncReconciler, SyncReport, SyncState};

struct CatalogState {
    items: Vec<PriceItem>,
    editor: EditSession,
}

/// Result of opening an item for editing
#[derive(Debug, Clone, Serialize)]
pub struct EditView {
    pub session: EditState,
    /// The previous draft, committed because another item was opened
    pub auto_committed: Option<PriceItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub removed: PriceItem,
    /// False when the remote copy may still exist
    pub remote_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub struct PriceCatalog {
    cache: LocalCache<PriceItem>,
    reconciler: SyncReconciler<PriceItem>,
    state: Mutex<CatalogState>,
    events: EventBus,
}

impl PriceCatalog {
    /// Open the catalog from its snapshot.
    pub async fn load(
        cache: LocalCache<PriceItem>,
        remote: Arc<dyn RemoteCatalog<PriceItem>>,
        events: EventBus,
    ) -> Self {
        let items = cache.read().await;
        info!(count = items.len(), "Price catalog loaded");
        Self {
            cache,
            reconciler: SyncReconciler::new(remote),
            state: Mutex::new(CatalogState {
                items,
                editor: EditSession::default(),
            }),
            events,
        }
    }

    fn table(&self) -> &str {
        self.cache.table()
    }

    fn ensure_not_syncing(&self) -> ApiResult<()> {
        if self.reconciler.is_syncing() {
            return Err(ApiError::conflict(
                "A sync pass is in progress; try again when it finishes",
            ));
        }
        Ok(())
    }

    pub async fn list(&self) -> Vec<PriceItem> {
        self.state.lock().await.items.clone()
    }

    pub async fn get(&self, id: &str) -> ApiResult<PriceItem> {
        self.state
            .lock()
            .await
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("Price item '{}' not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: PriceItemInput) -> ApiResult<PriceItem> {
        let valid = input.validate()?;

        let mut state = self.state.lock().await;
        self.ensure_not_syncing()?;

        let item = PriceItem::new_local(valid);
        let mut next = state.items.clone();
        next.push(item.clone());
        self.cache.write(&next).await?;
        state.items = next;

        info!(id = %item.id, name = %item.name, "Price item created");
        self.events
            .publish(EventKind::Created, self.table(), format!("{} ({})", item.name, item.id));
        Ok(item)
    }

    /// Remove an item locally, then tell the remote on a best-effort basis.
    /// A failed remote delete is reported, not raised.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> ApiResult<DeleteOutcome> {
        let mut state = self.state.lock().await;
        self.ensure_not_syncing()?;

        let index = state
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| ApiError::not_found(format!("Price item '{}' not found", id)))?;

        let mut next = state.items.clone();
        let removed = next.remove(index);
        self.cache.write(&next).await?;
        state.items = next;
        state.editor.discard_for(id);

        // never synced, so there is no remote copy
        let warning = if removed.is_local() {
            None
        } else {
            match self.reconciler.remote().delete(id).await {
                Ok(()) | Err(RemoteError::NotFound(_)) => None,
                Err(e) => {
                    warn!(id = id, error = %e, "Remote delete failed, removed locally only");
                    Some(e.to_string())
                }
            }
        };

        let detail = match warning {
            None => format!("{} ({})", removed.name, removed.id),
            Some(_) => format!("{} ({}) removed locally only", removed.name, removed.id),
        };
        self.events.publish(EventKind::Deleted, self.table(), detail);

        Ok(DeleteOutcome {
            removed,
            remote_deleted: warning.is_none(),
            warning,
        })
    }

    pub async fn edit_state(&self) -> EditState {
        self.state.lock().await.editor.state().clone()
    }

    /// Open `id` for editing. A draft already open on another item is
    /// committed first; if that draft is invalid the switch is refused.
    #[instrument(skip(self))]
    pub async fn begin_edit(&self, id: &str) -> ApiResult<EditView> {
        let mut state = self.state.lock().await;

        let item = state
            .items
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| ApiError::not_found(format!("Price item '{}' not found", id)))?;

        let current = state.editor.editing_id().map(str::to_string);
        let auto_committed = match current.as_deref() {
            Some(current) if current == id => {
                return Ok(EditView {
                    session: state.editor.state().clone(),
                    auto_committed: None,
                });
            }
            Some(_) => {
                self.ensure_not_syncing()?;
                Some(self.commit_locked(&mut state).await?)
            }
            None => None,
        };

        state.editor.start(&item)?;
        Ok(EditView {
            session: state.editor.state().clone(),
            auto_committed,
        })
    }

    pub async fn update_draft(&self, patch: DraftPatch) -> ApiResult<EditState> {
        let mut state = self.state.lock().await;
        state.editor.update_draft(patch)?;
        Ok(state.editor.state().clone())
    }

    #[instrument(skip(self))]
    pub async fn commit_edit(&self) -> ApiResult<PriceItem> {
        let mut state = self.state.lock().await;
        self.ensure_not_syncing()?;
        self.commit_locked(&mut state).await
    }

    pub async fn cancel_edit(&self) -> ApiResult<EditState> {
        let mut state = self.state.lock().await;
        state.editor.cancel()?;
        Ok(state.editor.state().clone())
    }

    async fn commit_locked(&self, state: &mut CatalogState) -> ApiResult<PriceItem> {
        let CatalogState { items, editor } = state;
        let (commit, id, valid) = editor.commit()?;

        let Some(index) = items.iter().position(|item| item.id == id) else {
            commit.discard();
            return Err(ApiError::not_found(format!("Price item '{}' not found", id)));
        };

        let mut next = items.clone();
        next[index].apply(valid);
        // an error here drops `commit` unsettled and the draft goes back to Editing
        self.cache.write(&next).await?;

        let updated = next[index].clone();
        *items = next;
        commit.finish();

        info!(id = %updated.id, "Price item updated");
        self.events.publish(
            EventKind::Updated,
            self.table(),
            format!("{} ({})", updated.name, updated.id),
        );
        Ok(updated)
    }

    pub fn sync_state(&self) -> SyncState {
        self.reconciler.state()
    }

    /// Run one reconciliation pass. On success the remote set replaces the
    /// local table and its snapshot; on any failure both stay as they were.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> ApiResult<SyncReport> {
        let pass = self.reconciler.try_begin()?;
        let local = self.state.lock().await.items.clone();

        let (records, report) = match self.reconciler.reconcile(local).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Sync pass failed");
                pass.fail(e.to_string());
                self.events
                    .publish(EventKind::SyncFailed, self.table(), e.to_string());
                return Err(e.into());
            }
        };

        let mut state = self.state.lock().await;
        if let Err(e) = self.cache.write(&records).await {
            warn!(error = %e, "Failed to persist synced snapshot");
            pass.fail(e.to_string());
            self.events
                .publish(EventKind::SyncFailed, self.table(), e.to_string());
            return Err(e.into());
        }

        for assignment in &report.assigned_ids {
            state
                .editor
                .rename_item(&assignment.local_id, &assignment.remote_id);
        }
        if let Some(editing) = state.editor.editing_id().map(str::to_string) {
            if !records.iter().any(|item| item.id == editing) {
                state.editor.discard_for(&editing);
            }
        }
        state.items = records;

        info!(
            created = report.created,
            updated = report.updated,
            total = report.total,
            "Sync pass complete"
        );
        pass.succeed(report.clone());
        self.events.publish(
            EventKind::SyncComplete,
            self.table(),
            format!(
                "{} created, {} updated, {} records",
                report.created, report.updated, report.total
            ),
        );
        Ok(report)
    }
}
