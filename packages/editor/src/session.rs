//! # Edit Session Management
//!
//! An EditSession binds one editable unit (a section, a focused field, a
//! collection entity) to at most one open draft, and enforces the phase
//! rules:
//!
//! ```text
//! Viewing --begin--> Editing --commit ok--> Viewing
//!                    Editing --commit fail--> Failed --mutate--> Editing
//!                    Editing|Failed --cancel--> Viewing
//! ```
//!
//! `Viewing` is the absence of a session. `Saving` blocks everything except
//! resolving the commit.

use crate::{EditorError, Mutation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Viewing,
    Editing,
    Saving,
    /// Last commit failed; the draft is intact and editable
    Failed,
}

impl Phase {
    pub fn is_editable(&self) -> bool {
        matches!(self, Phase::Editing | Phase::Failed)
    }
}

/// Working copy of a canonical value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Current edited value
    pub value: Value,

    /// The canonical value the draft was copied from
    pub original: Value,

    /// Canonical version at the time the draft was opened
    pub base_version: u64,
}

impl Draft {
    pub fn new(original: Value, base_version: u64) -> Self {
        Self {
            value: original.clone(),
            original,
            base_version,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.value != self.original
    }
}

/// Single edit session over one key
#[derive(Debug, Clone)]
pub struct EditSession<K> {
    key: K,

    /// Distinguishes this session from earlier/later sessions on the same key
    epoch: u64,

    phase: Phase,

    draft: Draft,

    /// Message of the last failed commit
    last_error: Option<String>,
}

impl<K: Display> EditSession<K> {
    pub fn begin(key: K, epoch: u64, original: Value, base_version: u64) -> Self {
        Self {
            key,
            epoch,
            phase: Phase::Editing,
            draft: Draft::new(original, base_version),
            last_error: None,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply a mutation to the draft. The canonical value is never touched.
    pub fn apply(&mut self, mutation: &Mutation) -> Result<&Draft, EditorError> {
        self.ensure_editable()?;

        self.draft.value = mutation.apply(&self.draft.value)?;
        if self.phase == Phase::Failed {
            self.phase = Phase::Editing;
        }

        tracing::debug!(key = %self.key, mutation = mutation.name(), "draft mutated");
        Ok(&self.draft)
    }

    /// Move to `Saving` and hand out the payload to persist
    pub fn start_save(&mut self) -> Result<Value, EditorError> {
        self.ensure_editable()?;
        self.phase = Phase::Saving;
        Ok(self.draft.value.clone())
    }

    /// Commit failed: keep the draft verbatim and allow retry or cancel
    pub fn save_failed(&mut self, error: impl Into<String>) {
        self.phase = Phase::Failed;
        self.last_error = Some(error.into());
    }

    /// Rebase the draft onto a newer canonical version whose edited scope is
    /// unchanged
    pub fn rebase(&mut self, base_version: u64) {
        self.draft.base_version = base_version;
    }

    fn ensure_editable(&self) -> Result<(), EditorError> {
        if self.phase.is_editable() {
            Ok(())
        } else {
            Err(EditorError::SessionBusy(self.key.to_string()))
        }
    }
}

/// At most one session per key
#[derive(Debug)]
pub struct SessionStore<K> {
    sessions: HashMap<K, EditSession<K>>,
    next_epoch: u64,
}

impl<K: Eq + Hash + Clone + Display> SessionStore<K> {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            next_epoch: 1,
        }
    }

    /// Open a session over `original`.
    ///
    /// An existing clean draft is replaced. A dirty draft is only replaced
    /// when `discard` is set; otherwise this fails with `DraftInProgress`.
    pub fn begin(
        &mut self,
        key: K,
        original: Value,
        base_version: u64,
        discard: bool,
    ) -> Result<&mut EditSession<K>, EditorError> {
        if let Some(existing) = self.sessions.get(&key) {
            if existing.phase() == Phase::Saving {
                return Err(EditorError::SessionBusy(key.to_string()));
            }
            if existing.draft().is_dirty() {
                if !discard {
                    return Err(EditorError::DraftInProgress(key.to_string()));
                }
                tracing::debug!(key = %key, "discarding unsaved draft");
            }
        }

        let epoch = self.next_epoch;
        self.next_epoch += 1;

        let session = EditSession::begin(key.clone(), epoch, original, base_version);
        self.sessions.insert(key.clone(), session);
        tracing::debug!(key = %key, epoch, "edit session opened");

        self.sessions
            .get_mut(&key)
            .ok_or_else(|| EditorError::NoSession(key.to_string()))
    }

    pub fn get(&self, key: &K) -> Option<&EditSession<K>> {
        self.sessions.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Result<&mut EditSession<K>, EditorError> {
        self.sessions
            .get_mut(key)
            .ok_or_else(|| EditorError::NoSession(key.to_string()))
    }

    /// Session on `key` only if it is still the one with `epoch`
    pub fn get_epoch_mut(&mut self, key: &K, epoch: u64) -> Option<&mut EditSession<K>> {
        self.sessions
            .get_mut(key)
            .filter(|session| session.epoch() == epoch)
    }

    pub fn phase(&self, key: &K) -> Phase {
        self.sessions
            .get(key)
            .map(EditSession::phase)
            .unwrap_or(Phase::Viewing)
    }

    /// Discard the draft. No session is not an error; a saving session is.
    pub fn cancel(&mut self, key: &K) -> Result<(), EditorError> {
        match self.phase(key) {
            Phase::Viewing => Ok(()),
            Phase::Saving => Err(EditorError::SessionBusy(key.to_string())),
            Phase::Editing | Phase::Failed => {
                self.sessions.remove(key);
                tracing::debug!(key = %key, "edit session cancelled");
                Ok(())
            }
        }
    }

    /// Close the session on `key` if it is still the one with `epoch`
    pub fn close(&mut self, key: &K, epoch: u64) -> bool {
        if self.get_epoch_mut(key, epoch).is_some() {
            self.sessions.remove(key);
            true
        } else {
            false
        }
    }

    /// Drop a session whatever its phase; used when its subject is deleted
    pub fn remove(&mut self, key: &K) -> Option<EditSession<K>> {
        self.sessions.remove(key)
    }

    /// Guard for a store write made on behalf of the saving session `epoch`.
    /// Dropping it without [`SavingGuard::disarm`] marks the session
    /// `Failed`, so an abandoned commit never leaves it stuck in `Saving`.
    pub fn saving_guard(&mut self, key: K, epoch: u64) -> SavingGuard<'_, K> {
        SavingGuard {
            store: self,
            key,
            epoch,
            armed: true,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &EditSession<K>> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<K: Eq + Hash + Clone + Display> Default for SessionStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SavingGuard<'a, K: Eq + Hash + Clone + Display> {
    store: &'a mut SessionStore<K>,
    key: K,
    epoch: u64,
    armed: bool,
}

impl<K: Eq + Hash + Clone + Display> SavingGuard<'_, K> {
    /// The write resolved; the caller reconciles the session itself
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl<K: Eq + Hash + Clone + Display> Drop for SavingGuard<'_, K> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(session) = self.store.get_epoch_mut(&self.key, self.epoch) {
            if session.phase() == Phase::Saving {
                session.save_failed("commit abandoned before the store answered");
                tracing::warn!(key = %self.key, epoch = self.epoch, "commit abandoned");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentdesk_common::FieldPath;
    use serde_json::json;

    fn set(path: &str, value: Value) -> Mutation {
        Mutation::set_field(FieldPath::parse(path).unwrap(), value)
    }

    #[test]
    fn test_session_creation() {
        let mut store: SessionStore<String> = SessionStore::new();
        let session = store
            .begin("hero".to_string(), json!({"title": "Hi"}), 3, false)
            .unwrap();

        assert_eq!(session.phase(), Phase::Editing);
        assert_eq!(session.draft().base_version, 3);
        assert!(!session.draft().is_dirty());
        assert_eq!(store.phase(&"about".to_string()), Phase::Viewing);
    }

    #[test]
    fn test_begin_over_dirty_draft_requires_discard() {
        let mut store: SessionStore<String> = SessionStore::new();
        let key = "hero".to_string();
        store.begin(key.clone(), json!({"title": "Hi"}), 0, false).unwrap();
        store
            .get_mut(&key)
            .unwrap()
            .apply(&set("title", json!("Hello")))
            .unwrap();

        let err = store.begin(key.clone(), json!({"title": "Hi"}), 0, false).unwrap_err();
        assert!(matches!(err, EditorError::DraftInProgress(_)));
        assert_eq!(store.get(&key).unwrap().draft().value["title"], json!("Hello"));

        let session = store.begin(key.clone(), json!({"title": "Hi"}), 0, true).unwrap();
        assert_eq!(session.draft().value["title"], json!("Hi"));
    }

    #[test]
    fn test_begin_over_clean_draft_replaces_silently() {
        let mut store: SessionStore<String> = SessionStore::new();
        let key = "hero".to_string();
        let first = store.begin(key.clone(), json!(1), 0, false).unwrap().epoch();
        let second = store.begin(key.clone(), json!(2), 1, false).unwrap().epoch();

        assert!(second > first);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_saving_blocks_mutation_cancel_and_begin() {
        let mut store: SessionStore<String> = SessionStore::new();
        let key = "stats".to_string();
        store.begin(key.clone(), json!({"a": 1}), 0, false).unwrap();
        store.get_mut(&key).unwrap().start_save().unwrap();

        assert!(matches!(
            store.get_mut(&key).unwrap().apply(&set("a", json!(2))),
            Err(EditorError::SessionBusy(_))
        ));
        assert!(matches!(store.cancel(&key), Err(EditorError::SessionBusy(_))));
        assert!(matches!(
            store.begin(key.clone(), json!({}), 0, true),
            Err(EditorError::SessionBusy(_))
        ));
        assert!(matches!(
            store.get_mut(&key).unwrap().start_save(),
            Err(EditorError::SessionBusy(_))
        ));
    }

    #[test]
    fn test_failed_save_keeps_draft_and_is_editable() {
        let mut store: SessionStore<String> = SessionStore::new();
        let key = "stats".to_string();
        store.begin(key.clone(), json!({"a": 1}), 0, false).unwrap();

        let session = store.get_mut(&key).unwrap();
        session.apply(&set("a", json!(2))).unwrap();
        let payload = session.start_save().unwrap();
        session.save_failed("503");

        assert_eq!(session.phase(), Phase::Failed);
        assert_eq!(session.draft().value, payload);
        assert_eq!(session.last_error(), Some("503"));

        session.apply(&set("a", json!(3))).unwrap();
        assert_eq!(session.phase(), Phase::Editing);
    }

    #[test]
    fn test_close_checks_epoch() {
        let mut store: SessionStore<String> = SessionStore::new();
        let key = "hero".to_string();
        let old = store.begin(key.clone(), json!(1), 0, false).unwrap().epoch();
        let new = store.begin(key.clone(), json!(1), 0, false).unwrap().epoch();

        assert!(!store.close(&key, old));
        assert!(store.get(&key).is_some());
        assert!(store.close(&key, new));
        assert!(store.is_empty());
    }

    #[test]
    fn test_dropped_saving_guard_fails_session() {
        let mut store: SessionStore<String> = SessionStore::new();
        let key = "hero".to_string();
        let epoch = store.begin(key.clone(), json!({"title": "Hi"}), 0, false).unwrap().epoch();
        store.get_mut(&key).unwrap().apply(&set("title", json!("Hey"))).unwrap();
        store.get_mut(&key).unwrap().start_save().unwrap();

        drop(store.saving_guard(key.clone(), epoch));

        let session = store.get(&key).unwrap();
        assert_eq!(session.phase(), Phase::Failed);
        assert_eq!(session.draft().value["title"], json!("Hey"));
        assert!(store.cancel(&key).is_ok());
    }

    #[test]
    fn test_disarmed_saving_guard_leaves_session() {
        let mut store: SessionStore<String> = SessionStore::new();
        let key = "hero".to_string();
        let epoch = store.begin(key.clone(), json!(1), 0, false).unwrap().epoch();
        store.get_mut(&key).unwrap().start_save().unwrap();

        store.saving_guard(key.clone(), epoch).disarm();
        assert_eq!(store.phase(&key), Phase::Saving);
    }

    #[test]
    fn test_cancel_without_session_is_noop() {
        let mut store: SessionStore<String> = SessionStore::new();
        assert!(store.cancel(&"nothing".to_string()).is_ok());
    }
}
