//! # In-Memory Gateway
//!
//! A complete store living in process memory. It assigns entity ids,
//! versions sections and rejects stale writes like the remote store does.
//! Every call is logged, and failures can be injected, which makes it the
//! gateway of choice for tests; the file-backed store wraps it too.

use crate::gateway::{
    FlagUpdate, GatewayError, GatewayResult, PersistenceGateway, SectionEndpoint, Versioned,
};
use async_trait::async_trait;
use contentdesk_common::{CollectionKind, EntityId, LeadKind, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Everything the store holds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    #[serde(default)]
    pub sections: BTreeMap<String, Versioned<Value>>,

    #[serde(default)]
    pub collections: BTreeMap<CollectionKind, Vec<Record>>,

    #[serde(default)]
    pub leads: BTreeMap<LeadKind, Vec<Record>>,

    /// Last id number handed out
    #[serde(default)]
    pub last_id: u64,
}

/// A call as seen by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    ReadSection(String),
    WriteSection(String),
    ListEntities(CollectionKind),
    CreateEntity(CollectionKind),
    UpdateEntity(CollectionKind, EntityId),
    UpdateEntityFlags(CollectionKind, EntityId),
    DeleteEntity(CollectionKind, EntityId),
    ListLeads(LeadKind),
    UpdateLeadStatus(LeadKind, EntityId),
}

impl GatewayCall {
    /// Whether the call changes the store
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            GatewayCall::ReadSection(_) | GatewayCall::ListEntities(_) | GatewayCall::ListLeads(_)
        )
    }
}

#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<StoreSnapshot>,
    calls: Mutex<Vec<GatewayCall>>,
    /// Number of upcoming calls that fail with a transport error
    failures: Mutex<u32>,
    /// How long every call takes before it reaches the store
    latency: Mutex<Option<Duration>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn id_prefix(kind: CollectionKind) -> &'static str {
    match kind {
        CollectionKind::Testimonials => "testimonial",
        CollectionKind::Services => "service",
    }
}

fn lead_prefix(kind: LeadKind) -> &'static str {
    match kind {
        LeadKind::Contacts => "contact",
        LeadKind::JobApplications => "application",
        LeadKind::FraudCases => "fraud",
        LeadKind::Users => "user",
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        lock(&self.state).clone()
    }

    /// Replace the whole store
    pub fn restore(&self, snapshot: StoreSnapshot) {
        *lock(&self.state) = snapshot;
    }

    /// Store a section directly (bumps its version)
    pub fn seed_section(&self, endpoint: &SectionEndpoint, value: Value) -> u64 {
        let mut state = lock(&self.state);
        let key = endpoint.key();
        let version = state.sections.get(&key).map(|v| v.version).unwrap_or(0) + 1;
        state.sections.insert(key, Versioned { value, version });
        version
    }

    /// Store an entity directly, assigning its id
    pub fn seed_entity(&self, kind: CollectionKind, fields: Value) -> Record {
        let mut state = lock(&self.state);
        let record = new_record(&mut state, id_prefix(kind), fields);
        state.collections.entry(kind).or_default().push(record.clone());
        record
    }

    /// Store a lead record directly, assigning its id
    pub fn seed_lead(&self, kind: LeadKind, fields: Value) -> Record {
        let mut state = lock(&self.state);
        let record = new_record(&mut state, lead_prefix(kind), fields);
        state.leads.entry(kind).or_default().push(record.clone());
        record
    }

    /// Make the next `count` calls fail with a transport error
    pub fn fail_next(&self, count: u32) {
        *lock(&self.failures) = count;
    }

    /// Delay every call by `latency`; `None` answers immediately
    pub fn set_latency(&self, latency: Option<Duration>) {
        *lock(&self.latency) = latency;
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.calls).clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&GatewayCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|call| predicate(call)).count()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    async fn enter(&self, call: GatewayCall) -> GatewayResult<MutexGuard<'_, StoreSnapshot>> {
        let description = format!("{:?}", call);
        lock(&self.calls).push(call);

        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut failures = lock(&self.failures);
        if *failures > 0 {
            *failures -= 1;
            return Err(GatewayError::Transport(format!(
                "injected failure on {}",
                description
            )));
        }
        drop(failures);

        Ok(lock(&self.state))
    }
}

fn new_record(state: &mut StoreSnapshot, prefix: &str, fields: Value) -> Record {
    state.last_id += 1;
    let mut fields = match fields {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    fields.remove("_id");
    fields
        .entry("createdAt")
        .or_insert_with(|| Value::String(chrono::Utc::now().to_rfc3339()));

    Record::new(EntityId::new(format!("{}-{}", prefix, state.last_id)), fields)
}

fn find_mut<'a>(records: Option<&'a mut Vec<Record>>, id: &EntityId) -> GatewayResult<&'a mut Record> {
    records
        .and_then(|records| records.iter_mut().find(|record| &record.id == id))
        .ok_or_else(|| GatewayError::NotFound(id.to_string()))
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn read_section(&self, endpoint: &SectionEndpoint) -> GatewayResult<Option<Versioned<Value>>> {
        let key = endpoint.key();
        let state = self.enter(GatewayCall::ReadSection(key.clone())).await?;
        Ok(state.sections.get(&key).cloned())
    }

    async fn write_section(
        &self,
        endpoint: &SectionEndpoint,
        value: Value,
        expected_version: Option<u64>,
    ) -> GatewayResult<Versioned<Value>> {
        let key = endpoint.key();
        let mut state = self.enter(GatewayCall::WriteSection(key.clone())).await?;

        let current = state.sections.get(&key).map(|v| v.version).unwrap_or(0);
        if let Some(expected) = expected_version {
            if expected != current {
                return Err(GatewayError::Conflict {
                    target: key,
                    expected,
                    actual: current,
                });
            }
        }

        let saved = Versioned {
            value,
            version: current + 1,
        };
        state.sections.insert(key, saved.clone());
        Ok(saved)
    }

    async fn list_entities(&self, kind: CollectionKind) -> GatewayResult<Vec<Record>> {
        let state = self.enter(GatewayCall::ListEntities(kind)).await?;
        Ok(state.collections.get(&kind).cloned().unwrap_or_default())
    }

    async fn create_entity(&self, kind: CollectionKind, template: Value) -> GatewayResult<Record> {
        let mut state = self.enter(GatewayCall::CreateEntity(kind)).await?;
        if !template.is_object() {
            return Err(GatewayError::Transport(format!(
                "store rejected {}: body must be an object",
                kind
            )));
        }

        let record = new_record(&mut state, id_prefix(kind), template);
        state.collections.entry(kind).or_default().push(record.clone());
        Ok(record)
    }

    async fn update_entity(
        &self,
        kind: CollectionKind,
        id: &EntityId,
        fields: Map<String, Value>,
    ) -> GatewayResult<()> {
        let mut state = self.enter(GatewayCall::UpdateEntity(kind, id.clone())).await?;
        let record = find_mut(state.collections.get_mut(&kind), id)?;

        let mut fields = fields;
        fields.remove("_id");
        record.merge(&fields);
        Ok(())
    }

    async fn update_entity_flags(
        &self,
        kind: CollectionKind,
        id: &EntityId,
        flags: &FlagUpdate,
    ) -> GatewayResult<()> {
        let mut state = self.enter(GatewayCall::UpdateEntityFlags(kind, id.clone())).await?;
        let record = find_mut(state.collections.get_mut(&kind), id)?;
        record.merge(&flags.to_fields());
        Ok(())
    }

    async fn delete_entity(&self, kind: CollectionKind, id: &EntityId) -> GatewayResult<()> {
        let mut state = self.enter(GatewayCall::DeleteEntity(kind, id.clone())).await?;
        let records = state.collections.entry(kind).or_default();

        let before = records.len();
        records.retain(|record| &record.id != id);
        if records.len() == before {
            return Err(GatewayError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_leads(&self, kind: LeadKind) -> GatewayResult<Vec<Record>> {
        let state = self.enter(GatewayCall::ListLeads(kind)).await?;
        Ok(state.leads.get(&kind).cloned().unwrap_or_default())
    }

    async fn update_lead_status(&self, kind: LeadKind, id: &EntityId, status: &str) -> GatewayResult<()> {
        let mut state = self.enter(GatewayCall::UpdateLeadStatus(kind, id.clone())).await?;
        let record = find_mut(state.leads.get_mut(&kind), id)?;
        record
            .fields
            .insert("status".to_string(), Value::String(status.to_string()));
        Ok(())
    }
}
