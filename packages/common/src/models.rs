//! Typed shapes of the built-in content.
//!
//! The editing engine itself works on plain JSON; these types provide the
//! default payloads the registry starts from and typed reads for callers that
//! want them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Convert a model into the JSON payload the engine edits
pub trait ToPayload: Serialize {
    fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Headline figures shown on the public site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub happy_clients: String,
    pub success_rate: String,
    pub growth_rate: String,
    pub fraud_cases_resolved: String,
}

impl Default for DashboardStats {
    fn default() -> Self {
        Self {
            happy_clients: "5000+".to_string(),
            success_rate: "98%".to_string(),
            growth_rate: "150%".to_string(),
            fraud_cases_resolved: "1200+".to_string(),
        }
    }
}

impl ToPayload for DashboardStats {}

/// Repeated contact channels; every list starts with one empty entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub phone: Vec<String>,
    pub email: Vec<String>,
    pub address: Vec<String>,
    pub working_hours: Vec<String>,
}

impl Default for ContactInfo {
    fn default() -> Self {
        Self {
            phone: vec![String::new()],
            email: vec![String::new()],
            address: vec![String::new()],
            working_hours: vec![String::new()],
        }
    }
}

impl ToPayload for ContactInfo {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyContact {
    pub email: String,
    pub phone: String,
    pub address: String,
}

/// Privacy policy and terms of service share one document shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    pub title: String,
    pub subtitle: String,
    pub introduction: String,
    pub contact_info: PolicyContact,
}

impl PolicyDocument {
    pub fn privacy_policy() -> Self {
        Self::with_heading("Privacy Policy", "How we protect your information", "privacy")
    }

    pub fn terms_of_service() -> Self {
        Self::with_heading("Terms of Service", "Legal Terms and Conditions", "legal")
    }

    fn with_heading(title: &str, subtitle: &str, mailbox: &str) -> Self {
        Self {
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            introduction: String::new(),
            contact_info: PolicyContact {
                email: format!("{}@dravedigitals.com", mailbox),
                phone: "+91 9876543210".to_string(),
                address: "Mumbai, Maharashtra, India".to_string(),
            },
        }
    }
}

impl ToPayload for PolicyDocument {}

/// Free-form website block (hero, about, services intro, contact intro)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebsiteContent {
    pub title: String,
    pub subtitle: String,
    pub content: String,
}

impl ToPayload for WebsiteContent {}

/// Blank testimonial as offered by the "new testimonial" form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestimonialTemplate {
    pub name: String,
    pub role: String,
    pub company: String,
    pub rating: u8,
    pub text: String,
    pub avatar: String,
    pub service: String,
    pub featured: bool,
    pub approved: bool,
}

impl Default for TestimonialTemplate {
    fn default() -> Self {
        Self {
            name: String::new(),
            role: String::new(),
            company: String::new(),
            rating: 5,
            text: String::new(),
            avatar: "👤".to_string(),
            service: String::new(),
            featured: false,
            approved: true,
        }
    }
}

impl ToPayload for TestimonialTemplate {}

/// Blank service as offered by the "new service" form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTemplate {
    pub title: String,
    pub description: String,
    pub icon: String,
    pub color: String,
    pub features: Vec<String>,
    pub active: bool,
    pub order: i64,
}

impl Default for ServiceTemplate {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            icon: "Shield".to_string(),
            color: "from-red-500 to-red-600".to_string(),
            features: vec![String::new()],
            active: true,
            order: 0,
        }
    }
}

impl ToPayload for ServiceTemplate {}
