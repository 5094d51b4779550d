use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Maximum stored length of a classification title, in characters.
pub const TITLE_MAX_CHARS: usize = 80;
/// Maximum stored length of a classification summary, in characters.
pub const SUMMARY_MAX_CHARS: usize = 200;
/// Maximum stored length of a supporting quote, in characters.
pub const QUOTE_MAX_CHARS: usize = 150;
/// Maximum stored length of classifier reasoning, in characters.
pub const REASONING_MAX_CHARS: usize = 300;
/// Maximum number of free-form tags kept per item.
pub const TAGS_MAX: usize = 5;

/// Triage priority assigned by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(ConfigError::Validation(format!(
                "invalid priority: {other}"
            ))),
        }
    }
}

/// Lifecycle state of a processing-queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Processing,
    Review,
    Completed,
    Error,
}

impl QueueStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Review => "review",
            QueueStatus::Completed => "completed",
            QueueStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QueueStatus::Pending),
            "processing" => Ok(QueueStatus::Processing),
            "review" => Ok(QueueStatus::Review),
            "completed" => Ok(QueueStatus::Completed),
            "error" => Ok(QueueStatus::Error),
            other => Err(ConfigError::Validation(format!(
                "invalid queue status: {other}"
            ))),
        }
    }
}

/// Analyst decision on an item in review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Undecided,
    Approved,
    Rejected,
}

impl Decision {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Undecided => "undecided",
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a configured content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Rss,
    Csv,
    Manual,
}

impl SourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Rss => "rss",
            SourceKind::Csv => "csv",
            SourceKind::Manual => "manual",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rss" => Ok(SourceKind::Rss),
            "csv" => Ok(SourceKind::Csv),
            "manual" => Ok(SourceKind::Manual),
            other => Err(ConfigError::Validation(format!(
                "invalid source kind: {other}"
            ))),
        }
    }
}

/// Classifier output for one item, after validation and truncation.
///
/// Downstream storage and the review UI assume the length bounds on
/// `title`/`summary`/`quote`/`reasoning`/`tags`; [`Classification::clamp`]
/// enforces them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub relevant: bool,
    /// PIR category code, or `"none"`.
    pub category: String,
    pub priority: Priority,
    /// Confidence in the categorization, 0–100.
    pub confidence: u8,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub quote: String,
    pub reasoning: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Classification {
    /// Truncate all free-text fields to their storage bounds.
    pub fn clamp(&mut self) {
        truncate_chars_in_place(&mut self.title, TITLE_MAX_CHARS);
        truncate_chars_in_place(&mut self.summary, SUMMARY_MAX_CHARS);
        truncate_chars_in_place(&mut self.quote, QUOTE_MAX_CHARS);
        truncate_chars_in_place(&mut self.reasoning, REASONING_MAX_CHARS);
        self.tags.truncate(TAGS_MAX);
    }
}

/// Truncate a string to at most `max` characters, respecting char boundaries.
#[must_use]
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn truncate_chars_in_place(s: &mut String, max: usize) {
    if let Some((idx, _)) = s.char_indices().nth(max) {
        s.truncate(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_round_trips_through_str() {
        for p in [Priority::High, Priority::Medium, Priority::Low] {
            assert_eq!(p.as_str().parse::<Priority>().unwrap(), p);
        }
    }

    #[test]
    fn priority_rejects_unknown_value() {
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn queue_status_round_trips_through_str() {
        for s in [
            QueueStatus::Pending,
            QueueStatus::Processing,
            QueueStatus::Review,
            QueueStatus::Completed,
            QueueStatus::Error,
        ] {
            assert_eq!(s.as_str().parse::<QueueStatus>().unwrap(), s);
        }
    }

    #[test]
    fn truncate_chars_shortens_long_input() {
        let long = "x".repeat(500);
        assert_eq!(truncate_chars(&long, 200).chars().count(), 200);
    }

    #[test]
    fn truncate_chars_leaves_short_input_untouched() {
        assert_eq!(truncate_chars("short", 200), "short");
    }

    #[test]
    fn truncate_chars_respects_multibyte_boundaries() {
        // Each 'é' is 2 bytes; a byte-based truncation would panic or corrupt.
        let s = "é".repeat(300);
        let t = truncate_chars(&s, 200);
        assert_eq!(t.chars().count(), 200);
        assert!(t.chars().all(|c| c == 'é'));
    }

    #[test]
    fn clamp_enforces_all_bounds() {
        let mut c = Classification {
            relevant: true,
            category: "sabotage".to_string(),
            priority: Priority::High,
            confidence: 90,
            title: "t".repeat(500),
            summary: "s".repeat(500),
            quote: "q".repeat(500),
            reasoning: "r".repeat(500),
            tags: (0..10).map(|i| format!("tag{i}")).collect(),
        };
        c.clamp();
        assert_eq!(c.title.chars().count(), TITLE_MAX_CHARS);
        assert_eq!(c.summary.chars().count(), SUMMARY_MAX_CHARS);
        assert_eq!(c.quote.chars().count(), QUOTE_MAX_CHARS);
        assert_eq!(c.reasoning.chars().count(), REASONING_MAX_CHARS);
        assert_eq!(c.tags.len(), TAGS_MAX);
    }

    #[test]
    fn classification_deserializes_with_optional_fields_missing() {
        let json = r#"{
            "relevant": true,
            "category": "geopolitical",
            "priority": "medium",
            "confidence": 75,
            "title": "t",
            "summary": "s",
            "reasoning": "r"
        }"#;
        let c: Classification = serde_json::from_str(json).unwrap();
        assert!(c.quote.is_empty());
        assert!(c.tags.is_empty());
        assert_eq!(c.priority, Priority::Medium);
    }
}
