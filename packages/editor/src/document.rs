//! # Canonical Values
//!
//! The last value known to be persisted for each section, with the store
//! version it was persisted at.
//!
//! Canonical values change only through a successful commit or a load from
//! the store, never through operator input. Older versions never overwrite
//! newer ones, so a late response cannot roll the console back.

use contentdesk_common::SectionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalValue {
    pub section: SectionId,
    pub value: Value,

    /// Store version; 0 means "registry default, never loaded or saved"
    pub version: u64,
}

#[derive(Debug, Default)]
pub struct CanonicalStore {
    values: BTreeMap<SectionId, CanonicalValue>,
}

impl CanonicalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, section: &SectionId) -> Option<&CanonicalValue> {
        self.values.get(section)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalValue> {
        self.values.values()
    }

    /// Seed a section with its default; does nothing if already present
    pub fn seed(&mut self, section: SectionId, value: Value) {
        self.values
            .entry(section.clone())
            .or_insert(CanonicalValue {
                section,
                value,
                version: 0,
            });
    }

    /// Install a value read from or written to the store.
    ///
    /// Returns `false` (and keeps the current value) when `version` is older
    /// than what is already held.
    pub fn accept(&mut self, section: SectionId, value: Value, version: u64) -> bool {
        if let Some(current) = self.values.get(&section) {
            if current.version > version {
                tracing::debug!(
                    section = %section,
                    held = current.version,
                    incoming = version,
                    "ignoring stale canonical value"
                );
                return false;
            }
        }

        self.values.insert(
            section.clone(),
            CanonicalValue {
                section,
                value,
                version,
            },
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seed_does_not_overwrite() {
        let mut store = CanonicalStore::new();
        let hero = SectionId::from("hero");

        store.seed(hero.clone(), json!({"title": "default"}));
        store.accept(hero.clone(), json!({"title": "loaded"}), 4);
        store.seed(hero.clone(), json!({"title": "default"}));

        let value = store.get(&hero).unwrap();
        assert_eq!(value.value["title"], json!("loaded"));
        assert_eq!(value.version, 4);
    }

    #[test]
    fn test_stale_version_is_ignored() {
        let mut store = CanonicalStore::new();
        let stats = SectionId::from("dashboardStats");

        assert!(store.accept(stats.clone(), json!({"successRate": "99%"}), 5));
        assert!(!store.accept(stats.clone(), json!({"successRate": "98%"}), 4));
        assert_eq!(store.get(&stats).unwrap().value["successRate"], json!("99%"));
    }
}
