//! Delimiter-separated upload parsing.
//!
//! Implements RFC 4180-style quoting (a quote toggles in-quotes mode, two
//! adjacent quotes inside quoted text are one literal quote, commas inside
//! quotes are not separators) and maps heterogeneous export headers onto
//! canonical fields through a fixed alias table. A malformed row is logged
//! and skipped; it never aborts the rest of the file.

use std::collections::HashMap;

use crate::error::IngestError;
use crate::types::{parse_feed_date, CanonicalItem};

/// Canonical field names a CSV header can resolve to.
const HEADER_ALIASES: &[(&str, &[&str])] = &[
    ("content", &["content", "text", "message", "post", "body"]),
    ("source", &["source", "platform"]),
    ("date", &["date", "created", "timestamp"]),
    ("author", &["author", "user", "username"]),
    ("url", &["url", "link"]),
    ("title", &["title", "headline"]),
    ("location", &["location", "country", "region"]),
];

/// Parse CSV text into canonical items.
///
/// The first non-blank line is the header; headers are matched
/// case-insensitively against the alias table. Rows whose resolved content
/// is empty after trimming are skipped.
///
/// # Errors
///
/// Returns [`IngestError::CsvTooShort`] when fewer than two non-blank lines
/// are present (header plus at least one data row).
pub fn parse_csv(text: &str, source_label: &str) -> Result<Vec<CanonicalItem>, IngestError> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    if lines.len() < 2 {
        return Err(IngestError::CsvTooShort { lines: lines.len() });
    }

    let headers: Vec<String> = parse_line(lines[0])
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    let field_index = resolve_headers(&headers);

    let mut items = Vec::new();
    for (line_no, line) in lines.iter().enumerate().skip(1) {
        let values = parse_line(line);
        if values.len() > headers.len() {
            tracing::warn!(
                source = source_label,
                row = line_no + 1,
                expected = headers.len(),
                got = values.len(),
                "CSV row has more fields than headers; skipping"
            );
            continue;
        }

        let get = |field: &str| -> &str {
            field_index
                .get(field)
                .and_then(|&idx| values.get(idx))
                .map_or("", String::as_str)
        };

        let content = get("content").trim().to_string();
        if content.is_empty() {
            tracing::debug!(
                source = source_label,
                row = line_no + 1,
                "CSV row has empty content; skipping"
            );
            continue;
        }

        let title = {
            let t = get("title").trim();
            if t.is_empty() {
                argus_core::truncate_chars(&content, argus_core::TITLE_MAX_CHARS).to_string()
            } else {
                t.to_string()
            }
        };

        items.push(CanonicalItem {
            title,
            body: content,
            summary: None,
            link: non_empty(get("url")),
            guid: None,
            author: non_empty(get("author")),
            published_at: parse_feed_date(get("date")),
            categories: Vec::new(),
        });
    }

    Ok(items)
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Map each canonical field to the column index of its first matching alias.
fn resolve_headers(headers: &[String]) -> HashMap<&'static str, usize> {
    let mut index = HashMap::new();
    for (field, aliases) in HEADER_ALIASES {
        for (col, header) in headers.iter().enumerate() {
            if aliases.contains(&header.trim()) {
                index.insert(*field, col);
                break;
            }
        }
    }
    index
}

/// Split one CSV line into fields with RFC 4180 quoting rules.
fn parse_line(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Escaped quote ("") inside quoted text.
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                result.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    result.push(current.trim().to_string());
    result
}
