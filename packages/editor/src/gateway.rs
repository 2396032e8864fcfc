//! # Persistence Gateway
//!
//! The asynchronous boundary to the remote content store. The engine never
//! assumes anything about transport; every method may fail, and a failure
//! leaves the store unchanged from the caller's point of view.

use async_trait::async_trait;
use contentdesk_common::{CollectionKind, EntityId, LeadKind, Record};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Store address of an editable section
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "endpoint", content = "section")]
pub enum SectionEndpoint {
    DashboardStats,
    ContactInfo,
    PrivacyPolicy,
    TermsOfService,
    /// Per-section website payload (hero, about, services, contact)
    WebsiteContent(String),
}

impl SectionEndpoint {
    /// Stable key used by stores to file the section
    pub fn key(&self) -> String {
        match self {
            SectionEndpoint::DashboardStats => "dashboardStats".to_string(),
            SectionEndpoint::ContactInfo => "contactInfo".to_string(),
            SectionEndpoint::PrivacyPolicy => "privacyPolicy".to_string(),
            SectionEndpoint::TermsOfService => "termsOfService".to_string(),
            SectionEndpoint::WebsiteContent(section) => format!("websiteContent/{}", section),
        }
    }
}

impl fmt::Display for SectionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// A payload together with the store version it was read or written at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// Boolean fields to set in one round trip. Omitted flags are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagUpdate(BTreeMap<String, bool>);

impl FlagUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, flag: impl Into<String>, value: bool) -> Self {
        self.0.insert(flag.into(), value);
        self
    }

    /// The testimonial status toggle: `approved` always, `featured` only if given
    pub fn testimonial_status(approved: bool, featured: Option<bool>) -> Self {
        let update = Self::new().set("approved", approved);
        match featured {
            Some(featured) => update.set("featured", featured),
            None => update,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &bool)> {
        self.0.iter()
    }

    /// The update as partial record fields
    pub fn to_fields(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(flag, value)| (flag.clone(), Value::Bool(*value)))
            .collect()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// Network failure, 5xx, or any rejection by the store
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Version conflict on {target}: expected {expected}, store has {actual}")]
    Conflict {
        target: String,
        expected: u64,
        actual: u64,
    },

    #[error("Not found: {0}")]
    NotFound(String),
}

impl GatewayError {
    /// Whether re-issuing the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Remote store operations consumed by the console
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Read a section; `None` if the store has never saved it
    async fn read_section(&self, endpoint: &SectionEndpoint) -> GatewayResult<Option<Versioned<Value>>>;

    /// Replace a section. With `expected_version` set, the store rejects the
    /// write if its current version differs.
    async fn write_section(
        &self,
        endpoint: &SectionEndpoint,
        value: Value,
        expected_version: Option<u64>,
    ) -> GatewayResult<Versioned<Value>>;

    async fn list_entities(&self, kind: CollectionKind) -> GatewayResult<Vec<Record>>;

    /// Create an entity; the returned record carries the store-assigned id
    async fn create_entity(&self, kind: CollectionKind, template: Value) -> GatewayResult<Record>;

    async fn update_entity(
        &self,
        kind: CollectionKind,
        id: &EntityId,
        fields: Map<String, Value>,
    ) -> GatewayResult<()>;

    async fn update_entity_flags(
        &self,
        kind: CollectionKind,
        id: &EntityId,
        flags: &FlagUpdate,
    ) -> GatewayResult<()>;

    async fn delete_entity(&self, kind: CollectionKind, id: &EntityId) -> GatewayResult<()>;

    async fn list_leads(&self, kind: LeadKind) -> GatewayResult<Vec<Record>>;

    async fn update_lead_status(&self, kind: LeadKind, id: &EntityId, status: &str) -> GatewayResult<()>;
}
