//! Priority Intelligence Requirements.

use serde::{Deserialize, Serialize};

/// A Priority Intelligence Requirement: one analyst-curated topic of
/// interest that classification scores content against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pir {
    pub name: String,
    /// Short code used as the classification category.
    pub category_code: String,
    pub description: String,
    pub keywords: Vec<String>,
    /// Minimum confidence (0–100) for a match to be considered actionable.
    pub confidence_threshold: i32,
}

/// Built-in PIR set used when no active PIRs are configured.
///
/// Classification must keep functioning against this set rather than fail
/// when the store is empty or unreachable.
#[must_use]
pub fn default_pirs() -> Vec<Pir> {
    vec![
        Pir {
            name: "Ukraine Conflict".to_string(),
            category_code: "ukraine".to_string(),
            description: "Frontline movements, political developments, strategic shifts"
                .to_string(),
            keywords: [
                "ukraine", "ukrainian", "bakhmut", "kharkiv", "frontline", "military", "zelensky",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            confidence_threshold: 70,
        },
        Pir {
            name: "Industrial Sabotage".to_string(),
            category_code: "sabotage".to_string(),
            description: "Infrastructure attacks, facility threats (focus Eurasia)".to_string(),
            keywords: [
                "sabotage",
                "infrastructure",
                "industrial",
                "cyber",
                "attack",
                "facility",
                "scada",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            confidence_threshold: 70,
        },
        Pir {
            name: "Insider Threats".to_string(),
            category_code: "insider".to_string(),
            description: "Employee security, background check issues".to_string(),
            keywords: [
                "employee",
                "insider",
                "security",
                "clearance",
                "background",
                "breach",
                "access",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            confidence_threshold: 70,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_has_three_distinct_categories() {
        let pirs = default_pirs();
        assert_eq!(pirs.len(), 3);
        let codes: std::collections::HashSet<&str> =
            pirs.iter().map(|p| p.category_code.as_str()).collect();
        assert_eq!(codes.len(), 3);
    }

    #[test]
    fn default_pirs_all_have_keywords() {
        for pir in default_pirs() {
            assert!(
                !pir.keywords.is_empty(),
                "PIR {} has no keywords; keyword fallback needs them",
                pir.category_code
            );
        }
    }
}
