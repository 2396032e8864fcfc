use crate::state::StateError;
use contentdesk_common::{EntityId, LeadKind, Record};
use contentdesk_editor::{GatewayError, PersistenceGateway, StatusNotifier};
use serde_json::Value;
use std::sync::Arc;

/// Submitted leads of one kind. Read-only apart from the status field.
pub struct LeadBoard {
    kind: LeadKind,
    records: Vec<Record>,
    gateway: Arc<dyn PersistenceGateway>,
    notifier: StatusNotifier,
}

impl LeadBoard {
    pub fn new(kind: LeadKind, gateway: Arc<dyn PersistenceGateway>, notifier: StatusNotifier) -> Self {
        Self {
            kind,
            records: Vec::new(),
            gateway,
            notifier,
        }
    }

    pub fn kind(&self) -> LeadKind {
        self.kind
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: &EntityId) -> Option<&Record> {
        self.records.iter().find(|record| &record.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub async fn load(&mut self) -> Result<(), GatewayError> {
        self.records = self.gateway.list_leads(self.kind).await?;
        tracing::debug!(leads = %self.kind, count = self.records.len(), "leads loaded");
        Ok(())
    }

    /// Set a lead's status; the local copy changes only after the store
    /// accepted it
    pub async fn update_status(&mut self, id: &EntityId, status: &str) -> Result<Record, StateError> {
        if self.get(id).is_none() {
            return Err(StateError::UnknownLead(id.clone()));
        }

        let label = self.kind.entity_label();
        match self.gateway.update_lead_status(self.kind, id, status).await {
            Ok(()) => {
                let record = self
                    .records
                    .iter_mut()
                    .find(|record| &record.id == id)
                    .ok_or_else(|| StateError::UnknownLead(id.clone()))?;
                record
                    .fields
                    .insert("status".to_string(), Value::String(status.to_string()));

                tracing::info!(leads = %self.kind, %id, status, "lead status updated");
                self.notifier.success(format!("{} status updated", label));
                Ok(record.clone())
            }
            Err(error) => {
                tracing::warn!(leads = %self.kind, %id, %error, "lead status update failed");
                self.notifier
                    .error(format!("Failed to update {} status", label.to_lowercase()));
                Err(error.into())
            }
        }
    }
}
