//! # Section Registry
//!
//! Maps section ids to their store endpoint and default draft shape, and
//! collections to their "new entity" template. New content types are added
//! by registration; the editing machinery is shared.

use crate::gateway::SectionEndpoint;
use crate::EditorError;
use contentdesk_common::models::{
    ContactInfo, DashboardStats, PolicyDocument, ServiceTemplate, TestimonialTemplate, ToPayload,
    WebsiteContent,
};
use contentdesk_common::{CollectionKind, SectionId};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSpec {
    pub id: SectionId,
    /// Operator-facing name used in status messages
    pub label: String,
    pub endpoint: SectionEndpoint,
    /// Value shown until the store has one
    pub default_value: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSpec {
    pub kind: CollectionKind,
    /// Blank entity offered by the create form
    pub template: Value,
}

#[derive(Debug, Clone, Default)]
pub struct SectionRegistry {
    sections: BTreeMap<SectionId, SectionSpec>,
    collections: BTreeMap<CollectionKind, CollectionSpec>,
}

impl SectionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in content type
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register_section(
            "dashboardStats",
            "Dashboard stat",
            SectionEndpoint::DashboardStats,
            DashboardStats::default().to_payload(),
        );
        registry.register_section(
            "contactInfo",
            "Contact information",
            SectionEndpoint::ContactInfo,
            ContactInfo::default().to_payload(),
        );
        registry.register_section(
            "privacyPolicy",
            "Privacy policy",
            SectionEndpoint::PrivacyPolicy,
            PolicyDocument::privacy_policy().to_payload(),
        );
        registry.register_section(
            "termsOfService",
            "Terms of service",
            SectionEndpoint::TermsOfService,
            PolicyDocument::terms_of_service().to_payload(),
        );
        for (section, label) in [
            ("hero", "Hero section"),
            ("about", "About section"),
            ("services", "Services section"),
            ("contact", "Contact section"),
        ] {
            registry.register_section(
                section,
                label,
                SectionEndpoint::WebsiteContent(section.to_string()),
                WebsiteContent::default().to_payload(),
            );
        }

        registry.register_collection(
            CollectionKind::Testimonials,
            TestimonialTemplate::default().to_payload(),
        );
        registry.register_collection(
            CollectionKind::Services,
            ServiceTemplate::default().to_payload(),
        );

        registry
    }

    /// Register (or replace) a section
    pub fn register_section(
        &mut self,
        id: impl Into<SectionId>,
        label: impl Into<String>,
        endpoint: SectionEndpoint,
        default_value: Value,
    ) -> Option<SectionSpec> {
        let id = id.into();
        self.sections.insert(
            id.clone(),
            SectionSpec {
                id,
                label: label.into(),
                endpoint,
                default_value,
            },
        )
    }

    pub fn register_collection(&mut self, kind: CollectionKind, template: Value) -> Option<CollectionSpec> {
        self.collections
            .insert(kind, CollectionSpec { kind, template })
    }

    pub fn section(&self, id: &SectionId) -> Result<&SectionSpec, EditorError> {
        self.sections
            .get(id)
            .ok_or_else(|| EditorError::UnknownSection(id.clone()))
    }

    pub fn collection(&self, kind: CollectionKind) -> Result<&CollectionSpec, EditorError> {
        self.collections
            .get(&kind)
            .ok_or(EditorError::UnknownCollection(kind))
    }

    pub fn sections(&self) -> impl Iterator<Item = &SectionSpec> {
        self.sections.values()
    }

    pub fn collections(&self) -> impl Iterator<Item = &CollectionSpec> {
        self.collections.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_sections() {
        let registry = SectionRegistry::builtin();
        let ids: Vec<&str> = registry.sections().map(|s| s.id.as_str()).collect();

        assert_eq!(
            ids,
            vec![
                "about",
                "contact",
                "contactInfo",
                "dashboardStats",
                "hero",
                "privacyPolicy",
                "services",
                "termsOfService"
            ]
        );

        let hero = registry.section(&SectionId::from("hero")).unwrap();
        assert_eq!(hero.endpoint, SectionEndpoint::WebsiteContent("hero".to_string()));

        let stats = registry.section(&SectionId::from("dashboardStats")).unwrap();
        assert_eq!(stats.default_value["happyClients"], json!("5000+"));
    }

    #[test]
    fn test_unknown_section_is_rejected() {
        let registry = SectionRegistry::builtin();
        let err = registry.section(&SectionId::from("pricing")).unwrap_err();
        assert!(matches!(err, EditorError::UnknownSection(id) if id.as_str() == "pricing"));
    }

    #[test]
    fn test_registration_adds_content_type() {
        let mut registry = SectionRegistry::new();
        assert!(registry.collection(CollectionKind::Services).is_err());

        registry.register_section(
            "faq",
            "FAQ",
            SectionEndpoint::WebsiteContent("faq".to_string()),
            json!({"items": []}),
        );
        assert!(registry.section(&SectionId::from("faq")).is_ok());

        let replaced = registry.register_section(
            "faq",
            "FAQ",
            SectionEndpoint::WebsiteContent("faq".to_string()),
            json!({"items": [""]}),
        );
        assert!(replaced.is_some());
    }
}
