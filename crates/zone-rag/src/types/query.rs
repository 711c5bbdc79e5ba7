//! Query types

use serde::{Deserialize, Serialize};

use super::document::ZoneCode;

/// Building type used by the consent preset when none is given
pub const DEFAULT_BUILDING_TYPE: &str = "garage";

/// A single question about one zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Zone the question is about
    pub zone: ZoneCode,
    /// Free-text question
    pub question: String,
}

impl Query {
    /// Create a new query
    pub fn new(zone: impl Into<ZoneCode>, question: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            question: question.into(),
        }
    }

    /// Query asking for a zone's headline building standards
    pub fn building_rules(zone: impl Into<ZoneCode>) -> Self {
        let zone = zone.into();
        let question = QueryPreset::BuildingRules.question(&zone);
        Self { zone, question }
    }

    /// Query asking which consents a given kind of building needs
    pub fn consent_requirements(zone: impl Into<ZoneCode>, building_type: &str) -> Self {
        let zone = zone.into();
        let question = QueryPreset::ConsentRequirements {
            building_type: building_type.to_string(),
        }
        .question(&zone);
        Self { zone, question }
    }
}

/// Canned questions for common planning lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "preset")]
pub enum QueryPreset {
    /// Height, coverage and setback standards
    BuildingRules,
    /// Building vs resource consent for a building type
    ConsentRequirements { building_type: String },
}

impl QueryPreset {
    /// Render the preset as a question about `zone`
    pub fn question(&self, zone: &ZoneCode) -> String {
        match self {
            Self::BuildingRules => format!(
                "What are the specific building rules, height restrictions, site coverage limits, \
                 and setback requirements for zone {}? Please provide exact measurements and \
                 percentages where available.",
                zone
            ),
            Self::ConsentRequirements { building_type } => format!(
                "What consent requirements apply for building a {} in zone {}? When is a building \
                 consent required versus a resource consent? What are the permitted activity \
                 standards?",
                building_type, zone
            ),
        }
    }
}
