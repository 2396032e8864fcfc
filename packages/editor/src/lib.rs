//! # Contentdesk Editor
//!
//! Edit-session engine for the operator console.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ registry: section ids → endpoint + defaults │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ controller: canonical values + drafts       │
//! │  - Begin / mutate / cancel drafts           │
//! │  - Array fields edited immutably            │
//! │  - Commit against the gateway               │
//! ├─────────────────────────────────────────────┤
//! │ collection: entity snapshots                │
//! │  - Create / patch / flags / 2-phase delete  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ gateway: the persistent store               │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Every outcome the operator should see is posted to the shared
//! [`StatusNotifier`].
//!
//! ## Core Principles
//!
//! 1. **Store is source of truth**: canonical values only change from a
//!    successful store response
//! 2. **Drafts are private**: nothing reaches the store before a commit
//! 3. **Failures are recoverable**: a failed commit keeps the draft intact
//!
//! ## Usage
//!
//! ```rust,ignore
//! use contentdesk_common::FieldPath;
//! use contentdesk_editor::{EditController, SessionKey, SectionRegistry, StatusNotifier};
//!
//! let mut controller = EditController::new(registry, gateway, StatusNotifier::new());
//! controller.load_all().await?;
//!
//! let key = SessionKey::section("dashboardStats");
//! controller.begin_edit(key.clone())?;
//! controller.update_draft_field(&key, FieldPath::parse("successRate")?, "99%".into())?;
//! controller.commit(&key).await?;
//! ```

mod array_field;
mod collection;
mod controller;
mod document;
mod errors;
mod gateway;
mod memory;
mod mutations;
mod notifier;
mod registry;
mod session;

pub use array_field::{append, edit_array, remove_at, replace_at};
pub use collection::{CollectionSynchronizer, DeleteToken};
pub use controller::{CommitTicket, EditController, SessionKey};
pub use document::{CanonicalStore, CanonicalValue};
pub use errors::EditorError;
pub use gateway::{
    FlagUpdate, GatewayError, GatewayResult, PersistenceGateway, SectionEndpoint, Versioned,
};
pub use memory::{GatewayCall, MemoryGateway, StoreSnapshot};
pub use mutations::Mutation;
pub use notifier::{StatusKind, StatusMessage, StatusNotifier, DEFAULT_MESSAGE_TTL};
pub use registry::{CollectionSpec, SectionRegistry, SectionSpec};
pub use session::{Draft, EditSession, Phase, SavingGuard, SessionStore};
