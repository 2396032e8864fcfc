//! # Collection Synchronizer
//!
//! Keeps the local snapshot of one collection (testimonials, services) in
//! step with the store, one entity at a time and without re-fetching:
//!
//! - `create` appends the store's record only after the store returned its id
//! - `patch` / `toggle_flags` shallow-merge the sent fields after success
//! - deletion is two-phase: `request_delete` hands out a token and only
//!   `confirm_delete` talks to the store; `abort_delete` is a no-op for it
//!
//! A failed call leaves the snapshot exactly as it was.

use crate::gateway::{FlagUpdate, GatewayResult, PersistenceGateway};
use crate::notifier::StatusNotifier;
use crate::registry::CollectionSpec;
use crate::session::{Draft, EditSession, SessionStore};
use crate::{EditorError, Mutation};
use contentdesk_common::{CollectionKind, CommonError, EntityId, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Pending-confirmation handle for a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeleteToken(u64);

impl fmt::Display for DeleteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "delete-{}", self.0)
    }
}

pub struct CollectionSynchronizer {
    kind: CollectionKind,
    default_template: Value,
    entities: Vec<Record>,

    /// The "new entity" form
    template: Value,

    /// Per-entity edit sessions
    edits: SessionStore<EntityId>,

    pending_deletes: BTreeMap<DeleteToken, EntityId>,
    next_token: u64,

    gateway: Arc<dyn PersistenceGateway>,
    notifier: StatusNotifier,
}

impl CollectionSynchronizer {
    pub fn new(spec: &CollectionSpec, gateway: Arc<dyn PersistenceGateway>, notifier: StatusNotifier) -> Self {
        Self {
            kind: spec.kind,
            default_template: spec.template.clone(),
            entities: Vec::new(),
            template: spec.template.clone(),
            edits: SessionStore::new(),
            pending_deletes: BTreeMap::new(),
            next_token: 1,
            gateway,
            notifier,
        }
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// Entities in creation order
    pub fn entities(&self) -> &[Record] {
        &self.entities
    }

    pub fn get(&self, id: &EntityId) -> Option<&Record> {
        self.entities.iter().find(|entity| &entity.id == id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Replace the snapshot with the store's listing
    pub async fn load(&mut self) -> Result<(), EditorError> {
        let entities = self.gateway.list_entities(self.kind).await?;
        tracing::debug!(collection = %self.kind, count = entities.len(), "collection loaded");

        self.pending_deletes
            .retain(|_, id| entities.iter().any(|entity| entity.id == *id));
        self.entities = entities;
        Ok(())
    }

    pub fn template(&self) -> &Value {
        &self.template
    }

    /// Edit the "new entity" form
    pub fn apply_template(&mut self, mutation: &Mutation) -> Result<&Value, EditorError> {
        self.template = mutation.apply(&self.template)?;
        Ok(&self.template)
    }

    pub fn reset_template(&mut self) {
        self.template = self.default_template.clone();
    }

    /// Create an entity from `template`. Nothing is inserted locally until
    /// the store has answered with the entity's id.
    pub async fn create(&mut self, template: Value) -> Result<Record, EditorError> {
        let label = self.kind.entity_label();

        match self.gateway.create_entity(self.kind, template).await {
            Ok(record) => {
                tracing::info!(collection = %self.kind, id = %record.id, "entity created");
                self.entities.push(record.clone());
                self.notifier.success(format!("{} created successfully", label));
                Ok(record)
            }
            Err(error) => {
                tracing::warn!(collection = %self.kind, %error, "create failed");
                self.notifier
                    .error(format!("Failed to create {}", label.to_lowercase()));
                Err(error.into())
            }
        }
    }

    /// Create from the form; the form resets only if the store accepted it
    pub async fn create_from_template(&mut self) -> Result<Record, EditorError> {
        let record = self.create(self.template.clone()).await?;
        self.reset_template();
        Ok(record)
    }

    /// Send a partial update; merge it locally once the store accepted it
    pub async fn patch(&mut self, id: &EntityId, fields: Map<String, Value>) -> Result<Record, EditorError> {
        self.ensure_known(id)?;

        let result = self.gateway.update_entity(self.kind, id, fields.clone()).await;
        self.finish_patch(id, &fields, result)
    }

    fn finish_patch(
        &mut self,
        id: &EntityId,
        fields: &Map<String, Value>,
        result: GatewayResult<()>,
    ) -> Result<Record, EditorError> {
        let label = self.kind.entity_label();
        match result {
            Ok(()) => {
                let record = self.merge_local(id, fields)?;
                tracing::info!(collection = %self.kind, %id, "entity patched");
                self.notifier.success(format!("{} updated successfully", label));
                Ok(record)
            }
            Err(error) => {
                tracing::warn!(collection = %self.kind, %id, %error, "patch failed");
                self.notifier
                    .error(format!("Failed to update {}", label.to_lowercase()));
                Err(error.into())
            }
        }
    }

    /// Set boolean flags in one round trip; omitted flags are untouched
    pub async fn toggle_flags(&mut self, id: &EntityId, flags: &FlagUpdate) -> Result<Record, EditorError> {
        self.ensure_known(id)?;
        if flags.is_empty() {
            return self.ensure_known(id).cloned();
        }

        let label = self.kind.entity_label();
        match self.gateway.update_entity_flags(self.kind, id, flags).await {
            Ok(()) => {
                let record = self.merge_local(id, &flags.to_fields())?;
                tracing::info!(collection = %self.kind, %id, "entity flags updated");
                self.notifier.success(format!("{} status updated", label));
                Ok(record)
            }
            Err(error) => {
                tracing::warn!(collection = %self.kind, %id, %error, "flag update failed");
                self.notifier
                    .error(format!("Failed to update {} status", label.to_lowercase()));
                Err(error.into())
            }
        }
    }

    /// Ask to delete `id`. The store is not contacted until the returned
    /// token is confirmed.
    pub fn request_delete(&mut self, id: &EntityId) -> Result<DeleteToken, EditorError> {
        self.ensure_known(id)?;

        let token = DeleteToken(self.next_token);
        self.next_token += 1;
        self.pending_deletes.insert(token, id.clone());

        tracing::debug!(collection = %self.kind, %id, %token, "delete awaiting confirmation");
        Ok(token)
    }

    /// Operator declined; nothing is sent to the store
    pub fn abort_delete(&mut self, token: DeleteToken) -> Result<EntityId, EditorError> {
        let id = self
            .pending_deletes
            .remove(&token)
            .ok_or(EditorError::UnknownToken(token))?;

        tracing::debug!(collection = %self.kind, %id, %token, "delete aborted");
        Ok(id)
    }

    /// Operator confirmed; delete in the store, then locally.
    ///
    /// On failure the token stays valid so the same confirmation can be
    /// retried.
    pub async fn confirm_delete(&mut self, token: DeleteToken) -> Result<EntityId, EditorError> {
        let id = self
            .pending_deletes
            .get(&token)
            .cloned()
            .ok_or(EditorError::UnknownToken(token))?;

        let label = self.kind.entity_label();
        match self.gateway.delete_entity(self.kind, &id).await {
            Ok(()) => {
                self.entities.retain(|entity| entity.id != id);
                self.pending_deletes.retain(|_, pending| *pending != id);
                self.edits.remove(&id);

                tracing::info!(collection = %self.kind, %id, "entity deleted");
                self.notifier.success(format!("{} deleted successfully", label));
                Ok(id)
            }
            Err(error) => {
                tracing::warn!(collection = %self.kind, %id, %error, "delete failed");
                self.notifier
                    .error(format!("Failed to delete {}", label.to_lowercase()));
                Err(error.into())
            }
        }
    }

    pub fn pending_deletes(&self) -> impl Iterator<Item = (&DeleteToken, &EntityId)> {
        self.pending_deletes.iter()
    }

    pub fn entity_edit(&self, id: &EntityId) -> Option<&EditSession<EntityId>> {
        self.edits.get(id)
    }

    /// Open a draft of an entity's fields
    pub fn begin_entity_edit(&mut self, id: &EntityId) -> Result<&Draft, EditorError> {
        self.open_entity_edit(id, false)
    }

    pub fn begin_entity_edit_discarding(&mut self, id: &EntityId) -> Result<&Draft, EditorError> {
        self.open_entity_edit(id, true)
    }

    fn open_entity_edit(&mut self, id: &EntityId, discard: bool) -> Result<&Draft, EditorError> {
        let original = self.ensure_known(id)?.fields_value();
        let session = self.edits.begin(id.clone(), original, 0, discard)?;
        Ok(session.draft())
    }

    pub fn apply_entity_edit(&mut self, id: &EntityId, mutation: &Mutation) -> Result<&Draft, EditorError> {
        self.edits.get_mut(id)?.apply(mutation)
    }

    pub fn cancel_entity_edit(&mut self, id: &EntityId) -> Result<(), EditorError> {
        self.edits.cancel(id)
    }

    /// Send the fields that changed in the entity draft as a patch
    pub async fn commit_entity_edit(&mut self, id: &EntityId) -> Result<Record, EditorError> {
        self.ensure_known(id)?;
        let session = self.edits.get_mut(id)?;
        let epoch = session.epoch();
        let changed = changed_fields(&session.draft().original, &session.draft().value)?;

        if changed.is_empty() {
            self.edits.close(id, epoch);
            return self.ensure_known(id).cloned();
        }
        session.start_save()?;
        let gateway = self.gateway.clone();

        let guard = self.edits.saving_guard(id.clone(), epoch);
        let result = gateway.update_entity(self.kind, id, changed.clone()).await;
        guard.disarm();

        match self.finish_patch(id, &changed, result) {
            Ok(record) => {
                self.edits.close(id, epoch);
                Ok(record)
            }
            Err(error) => {
                if let Some(session) = self.edits.get_epoch_mut(id, epoch) {
                    session.save_failed(error.to_string());
                }
                Err(error)
            }
        }
    }

    fn ensure_known(&self, id: &EntityId) -> Result<&Record, EditorError> {
        self.get(id).ok_or_else(|| EditorError::UnknownEntity(id.clone()))
    }

    fn merge_local(&mut self, id: &EntityId, fields: &Map<String, Value>) -> Result<Record, EditorError> {
        let entity = self
            .entities
            .iter_mut()
            .find(|entity| &entity.id == id)
            .ok_or_else(|| EditorError::UnknownEntity(id.clone()))?;
        entity.merge(fields);
        Ok(entity.clone())
    }
}

/// Top-level fields of `draft` that differ from `original`; removed fields
/// are sent as `null`
fn changed_fields(original: &Value, draft: &Value) -> Result<Map<String, Value>, EditorError> {
    let (Value::Object(original), Value::Object(draft)) = (original, draft) else {
        return Err(CommonError::Generic("entity drafts must be JSON objects".to_string()).into());
    };

    let mut changed: Map<String, Value> = draft
        .iter()
        .filter(|(key, value)| original.get(key.as_str()) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    for key in original.keys() {
        if !draft.contains_key(key) {
            changed.insert(key.clone(), Value::Null);
        }
    }

    Ok(changed)
}

impl fmt::Debug for CollectionSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionSynchronizer")
            .field("kind", &self.kind)
            .field("entities", &self.entities.len())
            .field("pending_deletes", &self.pending_deletes)
            .finish_non_exhaustive()
    }
}
