//! Analyst prompt construction for the AI provider.

use std::borrow::Cow;

use argus_core::Pir;

/// Maximum item content submitted for analysis, in characters.
pub const CONTENT_MAX_CHARS: usize = 10_000;

/// Appended when content is cut at [`CONTENT_MAX_CHARS`].
pub const TRUNCATION_MARKER: &str = "...";

/// Cap content at [`CONTENT_MAX_CHARS`] characters, appending the
/// truncation marker when anything was cut.
#[must_use]
pub fn cap_content(content: &str) -> Cow<'_, str> {
    match content.char_indices().nth(CONTENT_MAX_CHARS) {
        Some((idx, _)) => Cow::Owned(format!("{}{TRUNCATION_MARKER}", &content[..idx])),
        None => Cow::Borrowed(content),
    }
}

/// Render the active PIR set as context lines for the prompt.
#[must_use]
pub fn render_pir_context(pirs: &[Pir]) -> String {
    pirs.iter()
        .map(|pir| {
            let keywords = if pir.keywords.is_empty() {
                String::new()
            } else {
                format!(" Keywords: {}", pir.keywords.join(", "))
            };
            format!(
                "{} ({}): {}{keywords}",
                pir.name.to_uppercase(),
                pir.category_code,
                pir.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the full analysis prompt for one item.
///
/// `content` is capped to [`CONTENT_MAX_CHARS`]; the valid category codes in
/// the response contract are derived from `pirs` plus `"none"`.
#[must_use]
pub fn build_prompt(content: &str, source: &str, pirs: &[Pir]) -> String {
    let capped = cap_content(content);
    let pir_context = render_pir_context(pirs);
    let categories = pirs
        .iter()
        .map(|p| format!("\"{}\"", p.category_code))
        .chain(std::iter::once("\"none\"".to_string()))
        .collect::<Vec<_>>()
        .join(" | ");

    format!(
        r#"You are an intelligence analyst for corporate security. Analyze the following content against these Priority Intelligence Requirements (PIRs):

{pir_context}

Content to analyze:
"{capped}"

Source: {source}

Instructions:
1. Determine if this content is relevant to any PIR
2. Be conservative - only flag items with clear relevance
3. Consider context, not just keywords
4. Assess confidence based on content quality and relevance

Respond with a JSON object containing:
{{
    "relevant": true/false,
    "category": {categories},
    "priority": "high" | "medium" | "low",
    "confidence": 0-100,
    "title": "Clear, concise title for intelligence feed (max 80 chars)",
    "summary": "2-3 sentence summary for analysts (max 200 chars)",
    "quote": "Most relevant quote from original content (if applicable, max 150 chars)",
    "reasoning": "Brief explanation of categorization and confidence score",
    "tags": ["tag1", "tag2"]
}}

Only mark as relevant if it directly relates to one of our PIRs. Be conservative - it's better to reject marginally relevant items."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_core::default_pirs;

    #[test]
    fn short_content_is_not_truncated() {
        let capped = cap_content("short content");
        assert_eq!(capped, "short content");
    }

    #[test]
    fn long_content_is_capped_with_marker() {
        let long = "x".repeat(CONTENT_MAX_CHARS + 500);
        let capped = cap_content(&long);
        assert_eq!(capped.chars().count(), CONTENT_MAX_CHARS + TRUNCATION_MARKER.len());
        assert!(capped.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn pir_context_includes_name_code_and_keywords() {
        let context = render_pir_context(&default_pirs());
        assert!(context.contains("INDUSTRIAL SABOTAGE (sabotage):"));
        assert!(context.contains("Keywords: sabotage, infrastructure"));
    }

    #[test]
    fn prompt_lists_valid_categories_plus_none() {
        let prompt = build_prompt("content", "feed", &default_pirs());
        assert!(prompt.contains(r#""ukraine" | "sabotage" | "insider" | "none""#));
    }

    #[test]
    fn prompt_embeds_source_and_content() {
        let prompt = build_prompt("the content body", "unit-test-feed", &default_pirs());
        assert!(prompt.contains("Source: unit-test-feed"));
        assert!(prompt.contains("the content body"));
    }
}
