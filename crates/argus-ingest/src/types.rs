//! Canonical item shape shared by all ingestion paths.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// The normalized form every source (feed, CSV, manual entry) is converted
/// into before deduplication and enqueueing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CanonicalItem {
    pub title: String,
    /// Free-text body; for feeds this prefers full content over the short
    /// description.
    pub body: String,
    /// Short description, when the origin distinguishes one from the body.
    pub summary: Option<String>,
    pub link: Option<String>,
    /// Feed-native identifier (RSS `guid`, Atom `id`). `None` for CSV rows
    /// and manual entries.
    pub guid: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Category tags as provided by the origin.
    pub categories: Vec<String>,
}

impl CanonicalItem {
    /// Stable dedup hash over title + body + link, hex-encoded SHA-256.
    ///
    /// Deterministic across process restarts; two fetches of the same item
    /// always produce the same hash.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update(self.body.as_bytes());
        hasher.update(self.link.as_deref().unwrap_or("").as_bytes());
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Parse a timestamp from an origin, accepting RFC 2822 (RSS `pubDate`),
/// RFC 3339 (Atom `updated`/`published`), and bare `YYYY-MM-DD` dates (CSV
/// exports). Unparseable values become `None` rather than failing the item.
#[must_use]
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, body: &str, link: Option<&str>) -> CanonicalItem {
        CanonicalItem {
            title: title.to_string(),
            body: body.to_string(),
            summary: None,
            link: link.map(ToString::to_string),
            guid: None,
            author: None,
            published_at: None,
            categories: Vec::new(),
        }
    }

    #[test]
    fn content_hash_is_stable() {
        let a = item("Title", "Body", Some("https://example.com/a"));
        let b = item("Title", "Body", Some("https://example.com/a"));
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn content_hash_is_hex_sha256() {
        let h = item("t", "b", None).content_hash();
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn content_hash_differs_on_any_field() {
        let base = item("Title", "Body", Some("https://example.com/a"));
        assert_ne!(
            base.content_hash(),
            item("Title2", "Body", Some("https://example.com/a")).content_hash()
        );
        assert_ne!(
            base.content_hash(),
            item("Title", "Body2", Some("https://example.com/a")).content_hash()
        );
        assert_ne!(
            base.content_hash(),
            item("Title", "Body", Some("https://example.com/b")).content_hash()
        );
    }

    #[test]
    fn missing_link_hashes_like_empty_string() {
        assert_eq!(
            item("t", "b", None).content_hash(),
            item("t", "b", Some("")).content_hash()
        );
    }

    #[test]
    fn parse_feed_date_accepts_rfc2822() {
        let dt = parse_feed_date("Tue, 30 Jul 2025 10:30:00 GMT").expect("should parse");
        assert_eq!(dt.to_rfc3339(), "2025-07-30T10:30:00+00:00");
    }

    #[test]
    fn parse_feed_date_accepts_rfc3339() {
        let dt = parse_feed_date("2025-07-30T10:30:00Z").expect("should parse");
        assert_eq!(dt.to_rfc3339(), "2025-07-30T10:30:00+00:00");
    }

    #[test]
    fn parse_feed_date_accepts_bare_date() {
        let dt = parse_feed_date("2025-07-30").expect("should parse");
        assert_eq!(dt.to_rfc3339(), "2025-07-30T00:00:00+00:00");
    }

    #[test]
    fn parse_feed_date_rejects_garbage() {
        assert!(parse_feed_date("next tuesday").is_none());
        assert!(parse_feed_date("").is_none());
    }
}
