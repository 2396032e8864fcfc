//! Error types for the editor

use crate::collection::DeleteToken;
use crate::gateway::GatewayError;
use contentdesk_common::{CollectionKind, CommonError, EntityId, SectionId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Unknown section: {0}")]
    UnknownSection(SectionId),

    #[error("No collection registered for {0}")]
    UnknownCollection(CollectionKind),

    #[error("No open edit session for {0}")]
    NoSession(String),

    #[error("Edit session for {0} is saving")]
    SessionBusy(String),

    #[error("Unsaved draft already open for {0}")]
    DraftInProgress(String),

    #[error("{0} changed in the store since editing began")]
    Conflict(String),

    #[error("Unknown entity: {0}")]
    UnknownEntity(EntityId),

    #[error("Unknown delete token: {0}")]
    UnknownToken(DeleteToken),

    #[error("Field {0:?} does not hold an array")]
    NotAnArray(String),

    #[error("Path error: {0}")]
    Path(#[from] CommonError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

impl EditorError {
    /// Errors that come back from the store rather than from local misuse
    pub fn is_remote(&self) -> bool {
        matches!(self, EditorError::Gateway(_) | EditorError::Conflict(_))
    }
}
