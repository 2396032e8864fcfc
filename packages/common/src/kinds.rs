use crate::error::CommonError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Collections of store-identified entities the console can create and delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionKind {
    Testimonials,
    Services,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 2] = [CollectionKind::Testimonials, CollectionKind::Services];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Testimonials => "testimonials",
            CollectionKind::Services => "services",
        }
    }

    /// Singular noun used in operator-facing messages
    pub fn entity_label(&self) -> &'static str {
        match self {
            CollectionKind::Testimonials => "Testimonial",
            CollectionKind::Services => "Service",
        }
    }
}

/// Read-mostly lead lists whose only mutation is a status patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeadKind {
    Contacts,
    JobApplications,
    FraudCases,
    Users,
}

impl LeadKind {
    pub const ALL: [LeadKind; 4] = [
        LeadKind::Contacts,
        LeadKind::JobApplications,
        LeadKind::FraudCases,
        LeadKind::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadKind::Contacts => "contacts",
            LeadKind::JobApplications => "jobApplications",
            LeadKind::FraudCases => "fraudCases",
            LeadKind::Users => "users",
        }
    }

    pub fn entity_label(&self) -> &'static str {
        match self {
            LeadKind::Contacts => "Contact",
            LeadKind::JobApplications => "Job application",
            LeadKind::FraudCases => "Fraud case",
            LeadKind::Users => "User",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LeadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CollectionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CommonError::Generic(format!("unknown collection: {}", s)))
    }
}

impl FromStr for LeadKind {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CommonError::Generic(format!("unknown lead list: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_match_serde() {
        for kind in LeadKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(kind.as_str().parse::<LeadKind>().unwrap(), kind);
        }
        for kind in CollectionKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!("reviews".parse::<CollectionKind>().is_err());
        assert!("job-applications".parse::<LeadKind>().is_err());
    }
}
