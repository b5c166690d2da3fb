//! Edit session for price items.
//!
//! `Viewing → Editing → Committing → Viewing`. Only one item is edited at a
//! time; switching to another item commits the current draft first. A draft
//! that fails validation stays in `Editing` so nothing is lost.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{DraftPatch, PriceItem, PriceItemInput, ValidPriceItem, ValidationError};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EditState {
    Viewing,
    Editing {
        item_id: String,
        draft: PriceItemInput,
        started_at: DateTime<Utc>,
    },
    Committing {
        item_id: String,
        draft: PriceItemInput,
        started_at: DateTime<Utc>,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum EditError {
    #[error("No edit in progress")]
    NotEditing,

    #[error("Item '{0}' is already being edited")]
    AlreadyEditing(String),

    #[error("A commit is already in progress")]
    CommitInProgress,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Guarded transitions over [`EditState`].
#[derive(Debug, Clone)]
pub struct EditSession {
    state: EditState,
}

impl Default for EditSession {
    fn default() -> Self {
        Self {
            state: EditState::Viewing,
        }
    }
}

impl EditSession {
    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn editing_id(&self) -> Option<&str> {
        match &self.state {
            EditState::Editing { item_id, .. } | EditState::Committing { item_id, .. } => {
                Some(item_id)
            }
            EditState::Viewing => None,
        }
    }

    /// `Viewing → Editing`, seeding the draft from the stored item.
    pub fn start(&mut self, item: &PriceItem) -> Result<(), EditError> {
        match &self.state {
            EditState::Viewing => {
                self.state = EditState::Editing {
                    item_id: item.id.clone(),
                    draft: PriceItemInput::from(item),
                    started_at: Utc::now(),
                };
                Ok(())
            }
            EditState::Editing { item_id, .. } => Err(EditError::AlreadyEditing(item_id.clone())),
            EditState::Committing { .. } => Err(EditError::CommitInProgress),
        }
    }

    pub fn update_draft(&mut self, patch: DraftPatch) -> Result<&PriceItemInput, EditError> {
        match &mut self.state {
            EditState::Editing { draft, .. } => {
                draft.apply_patch(patch);
                Ok(draft)
            }
            EditState::Committing { .. } => Err(EditError::CommitInProgress),
            EditState::Viewing => Err(EditError::NotEditing),
        }
    }

    /// `Editing → Committing` if the draft validates; otherwise stay in `Editing`.
    pub fn begin_commit(&mut self) -> Result<(String, ValidPriceItem), EditError> {
        let (item_id, draft, started_at) = match &self.state {
            EditState::Editing {
                item_id,
                draft,
                started_at,
            } => (item_id.clone(), draft.clone(), *started_at),
            EditState::Committing { .. } => return Err(EditError::CommitInProgress),
            EditState::Viewing => return Err(EditError::NotEditing),
        };

        let valid = draft.validate()?;
        self.state = EditState::Committing {
            item_id: item_id.clone(),
            draft,
            started_at,
        };
        Ok((item_id, valid))
    }

    /// Like [`EditSession::begin_commit`], but hands back a guard that
    /// returns the session to `Editing` if it is dropped unfinished.
    pub fn commit(&mut self) -> Result<(CommitGuard<'_>, String, ValidPriceItem), EditError> {
        let (item_id, valid) = self.begin_commit()?;
        Ok((
            CommitGuard {
                session: self,
                settled: false,
            },
            item_id,
            valid,
        ))
    }

    /// `Committing → Viewing` once the change is persisted.
    pub fn finish_commit(&mut self) {
        if matches!(self.state, EditState::Committing { .. }) {
            self.state = EditState::Viewing;
        }
    }

    /// `Committing → Editing` when persisting failed; the draft is kept.
    pub fn abort_commit(&mut self) {
        if let EditState::Committing {
            item_id,
            draft,
            started_at,
        } = std::mem::replace(&mut self.state, EditState::Viewing)
        {
            self.state = EditState::Editing {
                item_id,
                draft,
                started_at,
            };
        }
    }

    /// `Editing → Viewing`, dropping the draft.
    pub fn cancel(&mut self) -> Result<(), EditError> {
        match self.state {
            EditState::Editing { .. } => {
                self.state = EditState::Viewing;
                Ok(())
            }
            EditState::Committing { .. } => Err(EditError::CommitInProgress),
            EditState::Viewing => Err(EditError::NotEditing),
        }
    }

    /// Follow an item whose id changed, e.g. a local id replaced by the
    /// server id during sync.
    pub fn rename_item(&mut self, from: &str, to: &str) {
        match &mut self.state {
            EditState::Editing { item_id, .. } | EditState::Committing { item_id, .. }
                if item_id == from =>
            {
                *item_id = to.to_string();
            }
            _ => {}
        }
    }

    /// Drop any session on `item_id`, e.g. because the item was deleted.
    pub fn discard_for(&mut self, item_id: &str) {
        if self.editing_id() == Some(item_id) {
            self.state = EditState::Viewing;
        }
    }
}

/// An in-flight commit. A write that fails or is abandoned mid-await drops
/// the guard unsettled, which puts the draft back into `Editing`.
pub struct CommitGuard<'a> {
    session: &'a mut EditSession,
    settled: bool,
}

impl CommitGuard<'_> {
    pub fn finish(mut self) {
        self.session.finish_commit();
        self.settled = true;
    }

    /// End the session outright; the item it pointed at is gone.
    pub fn discard(mut self) {
        self.session.state = EditState::Viewing;
        self.settled = true;
    }
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.session.abort_commit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceField;

    fn desk() -> PriceItem {
        PriceItem {
            id: "srv-1".to_string(),
            name: "Desk".to_string(),
            price: 10.0,
            category: None,
        }
    }

    #[test]
    fn full_cycle_returns_to_viewing() {
        let mut session = EditSession::default();
        session.start(&desk()).unwrap();
        session
            .update_draft(DraftPatch {
                price: Some(PriceField::Text("12.25".into())),
                ..Default::default()
            })
            .unwrap();

        let (id, valid) = session.begin_commit().unwrap();
        assert_eq!(id, "srv-1");
        assert_eq!(valid.price, 12.25);
        assert!(matches!(session.state(), EditState::Committing { .. }));

        session.finish_commit();
        assert_eq!(session.state(), &EditState::Viewing);
    }

    #[test]
    fn invalid_draft_stays_in_editing() {
        let mut session = EditSession::default();
        session.start(&desk()).unwrap();
        session
            .update_draft(DraftPatch {
                name: Some("  ".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(
            session.begin_commit().unwrap_err(),
            EditError::Invalid(ValidationError::EmptyName)
        );
        assert!(matches!(session.state(), EditState::Editing { .. }));
    }

    #[test]
    fn aborted_commit_keeps_the_draft() {
        let mut session = EditSession::default();
        session.start(&desk()).unwrap();
        session
            .update_draft(DraftPatch {
                name: Some("Standing Desk".into()),
                ..Default::default()
            })
            .unwrap();
        session.begin_commit().unwrap();
        session.abort_commit();

        match session.state() {
            EditState::Editing { draft, .. } => assert_eq!(draft.name, "Standing Desk"),
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn unsettled_commit_guard_rolls_back_to_editing() {
        let mut session = EditSession::default();
        session.start(&desk()).unwrap();

        let (guard, id, _) = session.commit().unwrap();
        assert_eq!(id, "srv-1");
        drop(guard);
        assert!(matches!(session.state(), EditState::Editing { .. }));

        let (guard, _, _) = session.commit().unwrap();
        guard.finish();
        assert_eq!(session.state(), &EditState::Viewing);
    }

    #[test]
    fn rename_follows_only_the_edited_item() {
        let mut session = EditSession::default();
        let mut local = desk();
        local.id = "local-1".into();
        session.start(&local).unwrap();

        session.rename_item("local-2", "srv-9");
        assert_eq!(session.editing_id(), Some("local-1"));
        session.rename_item("local-1", "srv-9");
        assert_eq!(session.editing_id(), Some("srv-9"));
    }

    #[test]
    fn guards_reject_out_of_order_transitions() {
        let mut session = EditSession::default();
        assert_eq!(session.cancel(), Err(EditError::NotEditing));
        assert_eq!(session.begin_commit().unwrap_err(), EditError::NotEditing);

        session.start(&desk()).unwrap();
        assert_eq!(
            session.start(&desk()),
            Err(EditError::AlreadyEditing("srv-1".into()))
        );

        session.begin_commit().unwrap();
        assert_eq!(session.cancel(), Err(EditError::CommitInProgress));
        assert!(session.update_draft(DraftPatch::default()).is_err());
    }
}
