use crate::leads::LeadBoard;
use contentdesk_common::{CollectionKind, EntityId, LeadKind};
use contentdesk_editor::{
    CollectionSynchronizer, EditController, EditorError, GatewayError, PersistenceGateway,
    SectionRegistry, StatusNotifier,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Unknown lead: {0}")]
    UnknownLead(EntityId),

    /// The task running a store call ended without an answer
    #[error("Request interrupted: {0}")]
    Interrupted(String),
}

/// Headline counts shown on the console's overview tab
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_contacts: usize,
    pub total_users: usize,
    pub job_applications: usize,
    pub fraud_cases: usize,
}

/// Everything the console shows.
///
/// Sections, each collection and each lead board sit behind their own lock,
/// so a slow store call on one part never blocks another. No code path
/// holds two of these locks at once.
pub struct ConsoleState {
    sections: Mutex<EditController>,
    collections: BTreeMap<CollectionKind, Mutex<CollectionSynchronizer>>,
    /// One board per [`LeadKind::ALL`] entry
    leads: BTreeMap<LeadKind, Mutex<LeadBoard>>,
    gateway: Arc<dyn PersistenceGateway>,
    notifier: StatusNotifier,
}

impl ConsoleState {
    /// State for every section and collection in `registry`, plus all lead
    /// boards. Nothing is read from the store until [`ConsoleState::load`].
    pub fn new(
        registry: SectionRegistry,
        gateway: Arc<dyn PersistenceGateway>,
        notifier: StatusNotifier,
    ) -> Self {
        let collections = registry
            .collections()
            .map(|spec| {
                let collection = CollectionSynchronizer::new(spec, gateway.clone(), notifier.clone());
                (spec.kind, Mutex::new(collection))
            })
            .collect();

        let leads = LeadKind::ALL
            .into_iter()
            .map(|kind| {
                let board = LeadBoard::new(kind, gateway.clone(), notifier.clone());
                (kind, Mutex::new(board))
            })
            .collect();

        let sections = EditController::new(Arc::new(registry), gateway.clone(), notifier.clone());

        Self {
            sections: Mutex::new(sections),
            collections,
            leads,
            gateway,
            notifier,
        }
    }

    /// Fetch sections, collections and leads concurrently.
    ///
    /// Parts that loaded are kept even when another part failed.
    pub async fn load(&self) -> Result<(), StateError> {
        let (sections, collections, leads) = tokio::join!(
            async { self.sections.lock().await.load_all().await },
            join_all(
                self.collections
                    .values()
                    .map(|collection| async move { collection.lock().await.load().await })
            ),
            join_all(
                self.leads
                    .values()
                    .map(|board| async move { board.lock().await.load().await })
            ),
        );

        let first_error = sections
            .err()
            .map(StateError::from)
            .or_else(|| collections.into_iter().find_map(|r| r.err()).map(StateError::from))
            .or_else(|| leads.into_iter().find_map(|r| r.err()).map(StateError::from));

        match first_error {
            Some(error) => {
                tracing::warn!(%error, "console load incomplete");
                self.notifier.error("Failed to fetch data");
                Err(error)
            }
            None => {
                tracing::info!("console loaded");
                Ok(())
            }
        }
    }

    pub fn sections(&self) -> &Mutex<EditController> {
        &self.sections
    }

    pub fn collection(&self, kind: CollectionKind) -> Result<&Mutex<CollectionSynchronizer>, StateError> {
        self.collections
            .get(&kind)
            .ok_or(StateError::Editor(EditorError::UnknownCollection(kind)))
    }

    pub fn leads(&self, kind: LeadKind) -> &Mutex<LeadBoard> {
        &self.leads[&kind]
    }

    /// The store every part of the console talks to
    pub fn gateway(&self) -> Arc<dyn PersistenceGateway> {
        self.gateway.clone()
    }

    pub fn notifier(&self) -> &StatusNotifier {
        &self.notifier
    }

    pub async fn overview(&self) -> Overview {
        Overview {
            total_contacts: self.leads(LeadKind::Contacts).lock().await.len(),
            total_users: self.leads(LeadKind::Users).lock().await.len(),
            job_applications: self.leads(LeadKind::JobApplications).lock().await.len(),
            fraud_cases: self.leads(LeadKind::FraudCases).lock().await.len(),
        }
    }
}
