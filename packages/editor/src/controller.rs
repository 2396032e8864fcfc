//! # Edit Controller
//!
//! Owns the canonical section values and their edit sessions, and runs the
//! commit protocol against the gateway:
//!
//! 1. `begin_commit` checks the draft against the current canonical value,
//!    moves the session to `Saving` and hands out a [`CommitTicket`]
//! 2. the host performs the gateway write (the controller need not be locked
//!    meanwhile, so other sections can keep editing and saving)
//! 3. `finish_commit` installs the store's response as the canonical value
//!    and closes the session, or marks the session `Failed` with its draft
//!    intact
//!
//! `commit` runs all three steps in one call. If its future is dropped
//! while the write is outstanding, the session is marked `Failed` so the
//! draft can be retried or cancelled.

use crate::document::{CanonicalStore, CanonicalValue};
use crate::gateway::{GatewayResult, PersistenceGateway, SectionEndpoint, Versioned};
use crate::notifier::StatusNotifier;
use crate::registry::SectionRegistry;
use crate::session::{Draft, EditSession, Phase, SessionStore};
use crate::{EditorError, Mutation};
use contentdesk_common::{FieldPath, SectionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// What an edit session is about: a whole section, or one field of it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionKey {
    pub section: SectionId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<FieldPath>,
}

impl SessionKey {
    pub fn section(section: impl Into<SectionId>) -> Self {
        Self {
            section: section.into(),
            focus: None,
        }
    }

    /// Edit a single field; committing writes the whole section with only
    /// that field replaced
    pub fn field(section: impl Into<SectionId>, focus: FieldPath) -> Self {
        Self {
            section: section.into(),
            focus: Some(focus).filter(|path| !path.is_root()),
        }
    }

    /// The part of a section value this key edits
    pub fn scope(&self, section_value: &Value) -> Value {
        match &self.focus {
            Some(path) => path.get(section_value).cloned().unwrap_or(Value::Null),
            None => section_value.clone(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.focus {
            Some(path) => write!(f, "{}:{}", self.section, path),
            None => write!(f, "{}", self.section),
        }
    }
}

/// An in-flight section write
#[derive(Debug, Clone)]
pub struct CommitTicket {
    pub key: SessionKey,
    pub epoch: u64,
    pub endpoint: SectionEndpoint,
    pub label: String,
    /// Full section payload to write
    pub payload: Value,
    pub expected_version: u64,
}

pub struct EditController {
    registry: Arc<SectionRegistry>,
    canonical: CanonicalStore,
    sessions: SessionStore<SessionKey>,
    gateway: Arc<dyn PersistenceGateway>,
    notifier: StatusNotifier,
}

impl EditController {
    /// Controller with every registered section at its default value
    pub fn new(
        registry: Arc<SectionRegistry>,
        gateway: Arc<dyn PersistenceGateway>,
        notifier: StatusNotifier,
    ) -> Self {
        let mut canonical = CanonicalStore::new();
        for spec in registry.sections() {
            canonical.seed(spec.id.clone(), spec.default_value.clone());
        }

        Self {
            registry,
            canonical,
            sessions: SessionStore::new(),
            gateway,
            notifier,
        }
    }

    pub fn registry(&self) -> &SectionRegistry {
        &self.registry
    }

    pub fn gateway(&self) -> Arc<dyn PersistenceGateway> {
        self.gateway.clone()
    }

    pub fn notifier(&self) -> &StatusNotifier {
        &self.notifier
    }

    /// Read every registered section concurrently.
    ///
    /// Sections the store has never saved keep their defaults. Sections that
    /// loaded are installed even if others failed; the first failure is
    /// returned.
    pub async fn load_all(&mut self) -> Result<(), EditorError> {
        let targets: Vec<(SectionId, SectionEndpoint)> = self
            .registry
            .sections()
            .map(|spec| (spec.id.clone(), spec.endpoint.clone()))
            .collect();

        let gateway = self.gateway.clone();
        let results =
            futures::future::join_all(targets.iter().map(|(_, endpoint)| gateway.read_section(endpoint))).await;

        let mut first_error = None;
        for ((section, endpoint), result) in targets.into_iter().zip(results) {
            match result {
                Ok(Some(loaded)) => {
                    self.canonical.accept(section, loaded.value, loaded.version);
                }
                Ok(None) => {
                    tracing::debug!(section = %section, "store has no value yet, keeping default");
                }
                Err(error) => {
                    tracing::warn!(section = %section, endpoint = %endpoint, %error, "failed to load section");
                    first_error.get_or_insert(error);
                }
            }
        }

        match first_error {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    /// Re-read one section from the store
    pub async fn load_section(&mut self, section: &SectionId) -> Result<&CanonicalValue, EditorError> {
        let endpoint = self.registry.section(section)?.endpoint.clone();
        if let Some(loaded) = self.gateway.read_section(&endpoint).await? {
            self.canonical.accept(section.clone(), loaded.value, loaded.version);
        }
        self.canonical(section)
    }

    pub fn canonical(&self, section: &SectionId) -> Result<&CanonicalValue, EditorError> {
        self.canonical
            .get(section)
            .ok_or_else(|| EditorError::UnknownSection(section.clone()))
    }

    pub fn canonical_values(&self) -> impl Iterator<Item = &CanonicalValue> {
        self.canonical.iter()
    }

    pub fn session(&self, key: &SessionKey) -> Option<&EditSession<SessionKey>> {
        self.sessions.get(key)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &EditSession<SessionKey>> {
        self.sessions.iter()
    }

    pub fn phase(&self, key: &SessionKey) -> Phase {
        self.sessions.phase(key)
    }

    /// What the operator sees for `key`: the draft while editing, otherwise
    /// the canonical value
    pub fn view(&self, key: &SessionKey) -> Result<Value, EditorError> {
        if let Some(session) = self.sessions.get(key) {
            return Ok(session.draft().value.clone());
        }
        Ok(key.scope(&self.canonical(&key.section)?.value))
    }

    /// Open a draft copy of the canonical value.
    ///
    /// Fails with `DraftInProgress` if an unsaved draft is already open for
    /// the same key; see [`EditController::begin_edit_discarding`].
    pub fn begin_edit(&mut self, key: SessionKey) -> Result<&Draft, EditorError> {
        self.open(key, false)
    }

    /// Open a draft, throwing away any unsaved draft for the same key
    pub fn begin_edit_discarding(&mut self, key: SessionKey) -> Result<&Draft, EditorError> {
        self.open(key, true)
    }

    fn open(&mut self, key: SessionKey, discard: bool) -> Result<&Draft, EditorError> {
        let canonical = self.canonical(&key.section)?;
        let original = key.scope(&canonical.value);
        let version = canonical.version;

        let session = self.sessions.begin(key, original, version, discard)?;
        Ok(session.draft())
    }

    pub fn apply(&mut self, key: &SessionKey, mutation: &Mutation) -> Result<&Draft, EditorError> {
        self.sessions.get_mut(key)?.apply(mutation)
    }

    /// Replace the value at `path` inside the draft
    pub fn update_draft_field(
        &mut self,
        key: &SessionKey,
        path: FieldPath,
        value: Value,
    ) -> Result<&Draft, EditorError> {
        self.apply(key, &Mutation::SetField { path, value })
    }

    /// Discard the draft and return to viewing
    pub fn cancel(&mut self, key: &SessionKey) -> Result<(), EditorError> {
        self.registry.section(&key.section)?;
        self.sessions.cancel(key)
    }

    /// First half of a commit: validate, move to `Saving`, build the payload
    pub fn begin_commit(&mut self, key: &SessionKey) -> Result<CommitTicket, EditorError> {
        let registry = self.registry.clone();
        let spec = registry.section(&key.section)?;
        let canonical = self
            .canonical
            .get(&key.section)
            .ok_or_else(|| EditorError::UnknownSection(key.section.clone()))?;

        let session = self.sessions.get_mut(key)?;
        if !session.phase().is_editable() {
            return Err(EditorError::SessionBusy(key.to_string()));
        }

        if canonical.version != session.draft().base_version {
            // Someone saved this section since the draft was opened. Only the
            // edited scope matters: untouched siblings are rebased over.
            if key.scope(&canonical.value) != session.draft().original {
                session.save_failed("changed in the store since editing began");
                tracing::warn!(
                    key = %key,
                    base = session.draft().base_version,
                    current = canonical.version,
                    "stale draft rejected"
                );
                self.notifier.error(format!(
                    "{} was changed elsewhere; reload before saving",
                    spec.label
                ));
                return Err(EditorError::Conflict(key.to_string()));
            }
            session.rebase(canonical.version);
        }

        let payload = match &key.focus {
            Some(path) => path.set(&canonical.value, session.draft().value.clone())?,
            None => session.draft().value.clone(),
        };
        session.start_save()?;

        tracing::debug!(key = %key, epoch = session.epoch(), "commit started");
        Ok(CommitTicket {
            key: key.clone(),
            epoch: session.epoch(),
            endpoint: spec.endpoint.clone(),
            label: spec.label.clone(),
            payload,
            expected_version: canonical.version,
        })
    }

    /// Second half of a commit: reconcile the gateway result
    pub fn finish_commit(
        &mut self,
        ticket: CommitTicket,
        result: GatewayResult<Versioned<Value>>,
    ) -> Result<CanonicalValue, EditorError> {
        match result {
            Ok(saved) => {
                let section = ticket.key.section.clone();
                self.canonical.accept(section.clone(), saved.value, saved.version);

                if !self.sessions.close(&ticket.key, ticket.epoch) {
                    tracing::debug!(key = %ticket.key, "commit resolved after its session closed");
                }
                tracing::info!(key = %ticket.key, version = saved.version, "section committed");
                self.notifier
                    .success(format!("{} updated successfully", ticket.label));

                self.canonical(&section).cloned()
            }
            Err(error) => {
                if let Some(session) = self.sessions.get_epoch_mut(&ticket.key, ticket.epoch) {
                    session.save_failed(error.to_string());
                }
                tracing::warn!(key = %ticket.key, %error, "commit failed");
                self.notifier
                    .error(format!("Failed to update {}", ticket.label.to_lowercase()));

                Err(error.into())
            }
        }
    }

    /// Persist the draft for `key` and fold the result back in
    pub async fn commit(&mut self, key: &SessionKey) -> Result<CanonicalValue, EditorError> {
        let ticket = self.begin_commit(key)?;
        let gateway = self.gateway.clone();

        let guard = self.sessions.saving_guard(ticket.key.clone(), ticket.epoch);
        let result = gateway
            .write_section(&ticket.endpoint, ticket.payload.clone(), Some(ticket.expected_version))
            .await;
        guard.disarm();

        self.finish_commit(ticket, result)
    }
}

impl fmt::Debug for EditController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditController")
            .field("canonical", &self.canonical)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}
