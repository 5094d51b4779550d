//! Deterministic keyword classifier.
//!
//! Used when the AI provider is unavailable (missing credentials) so the
//! pipeline degrades instead of stalling. Scans content for each PIR's
//! keyword list; the PIR with the most distinct matches wins, and confidence
//! is derived from the match count.

use argus_core::{truncate_chars, Classification, Pir, Priority, SUMMARY_MAX_CHARS, TITLE_MAX_CHARS};

/// Confidence floor for a single keyword match.
const BASE_CONFIDENCE: u8 = 40;
/// Confidence added per distinct matching keyword.
const PER_MATCH_CONFIDENCE: u8 = 15;
/// Keyword matching never claims more certainty than this.
const MAX_CONFIDENCE: u8 = 90;
/// Confidence reported for items with no keyword match at all.
const IRRELEVANT_CONFIDENCE: u8 = 25;

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Score `content` against the PIR keyword lists.
    ///
    /// Relevance requires at least one distinct keyword match; the matched
    /// PIR's category code becomes the classification category.
    #[must_use]
    pub fn classify(self, content: &str, pirs: &[Pir]) -> Classification {
        let lowered = content.to_lowercase();

        let best = pirs
            .iter()
            .map(|pir| (pir, count_matches(&lowered, &pir.keywords)))
            .max_by_key(|&(_, matches)| matches)
            .filter(|&(_, matches)| matches > 0);

        match best {
            Some((pir, matches)) => {
                let confidence =
                    BASE_CONFIDENCE.saturating_add(per_match_total(matches)).min(MAX_CONFIDENCE);
                let priority = if matches >= 3 {
                    Priority::High
                } else {
                    Priority::Medium
                };
                Classification {
                    relevant: true,
                    category: pir.category_code.clone(),
                    priority,
                    confidence,
                    title: truncate_chars(content.trim(), TITLE_MAX_CHARS).to_string(),
                    summary: truncate_chars(content.trim(), SUMMARY_MAX_CHARS).to_string(),
                    quote: String::new(),
                    reasoning: format!(
                        "Keyword match: {matches} term(s) from the {} PIR",
                        pir.name
                    ),
                    tags: matched_keywords(&lowered, &pir.keywords),
                }
            }
            None => Classification {
                relevant: false,
                category: "none".to_string(),
                priority: Priority::Low,
                confidence: IRRELEVANT_CONFIDENCE,
                title: truncate_chars(content.trim(), TITLE_MAX_CHARS).to_string(),
                summary: truncate_chars(content.trim(), SUMMARY_MAX_CHARS).to_string(),
                quote: String::new(),
                reasoning: "No PIR keyword match found".to_string(),
                tags: Vec::new(),
            },
        }
    }
}

fn count_matches(lowered_content: &str, keywords: &[String]) -> usize {
    keywords
        .iter()
        .filter(|kw| !kw.is_empty() && lowered_content.contains(&kw.to_lowercase()))
        .count()
}

fn matched_keywords(lowered_content: &str, keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .filter(|kw| !kw.is_empty() && lowered_content.contains(&kw.to_lowercase()))
        .take(argus_core::TAGS_MAX)
        .cloned()
        .collect()
}

fn per_match_total(matches: usize) -> u8 {
    u8::try_from(matches.saturating_mul(usize::from(PER_MATCH_CONFIDENCE))).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_core::default_pirs;

    #[test]
    fn unmatched_content_is_not_relevant() {
        let c = KeywordClassifier.classify("quarterly earnings were solid", &default_pirs());
        assert!(!c.relevant);
        assert_eq!(c.category, "none");
        assert_eq!(c.confidence, IRRELEVANT_CONFIDENCE);
    }

    #[test]
    fn single_match_selects_the_pir_category() {
        let c = KeywordClassifier.classify(
            "reports of sabotage at a regional plant",
            &default_pirs(),
        );
        assert!(c.relevant);
        assert_eq!(c.category, "sabotage");
        assert_eq!(c.priority, Priority::Medium);
        assert_eq!(c.confidence, BASE_CONFIDENCE + PER_MATCH_CONFIDENCE);
    }

    #[test]
    fn many_matches_raise_priority_and_confidence() {
        let c = KeywordClassifier.classify(
            "coordinated cyber attack on scada infrastructure at the facility",
            &default_pirs(),
        );
        assert!(c.relevant);
        assert_eq!(c.category, "sabotage");
        assert_eq!(c.priority, Priority::High);
        assert!(c.confidence > BASE_CONFIDENCE + PER_MATCH_CONFIDENCE);
    }

    #[test]
    fn confidence_is_capped() {
        // All seven sabotage keywords present.
        let c = KeywordClassifier.classify(
            "sabotage of industrial infrastructure: cyber attack on a scada facility",
            &default_pirs(),
        );
        assert!(c.confidence <= MAX_CONFIDENCE);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let c = KeywordClassifier.classify("SABOTAGE suspected", &default_pirs());
        assert!(c.relevant);
        assert_eq!(c.category, "sabotage");
    }

    #[test]
    fn the_pir_with_most_matches_wins() {
        let c = KeywordClassifier.classify(
            "ukrainian military frontline report mentions one employee",
            &default_pirs(),
        );
        assert_eq!(c.category, "ukraine");
    }

    #[test]
    fn title_and_summary_respect_bounds() {
        let long = "sabotage ".repeat(100);
        let c = KeywordClassifier.classify(&long, &default_pirs());
        assert!(c.title.chars().count() <= TITLE_MAX_CHARS);
        assert!(c.summary.chars().count() <= SUMMARY_MAX_CHARS);
    }

    #[test]
    fn tags_are_matched_keywords() {
        let c = KeywordClassifier.classify(
            "cyber attack against infrastructure",
            &default_pirs(),
        );
        assert!(c.tags.iter().any(|t| t == "cyber"));
        assert!(c.tags.len() <= argus_core::TAGS_MAX);
    }

    #[test]
    fn empty_pir_set_yields_not_relevant() {
        let c = KeywordClassifier.classify("sabotage everywhere", &[]);
        assert!(!c.relevant);
    }
}
