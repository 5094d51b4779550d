//! RSS 2.0 and Atom feed parsing.
//!
//! Both dialects normalize into a single [`FeedDocument`]. Dialect is
//! auto-detected from the root element; per-item extraction prefers the
//! full-content field over the short description when both are present
//! (RSS `content:encoded` over `description`, Atom `content` over
//! `summary`). Items lacking both a title and a description are dropped.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::IngestError;
use crate::types::{parse_feed_date, CanonicalItem};

/// Canonical parsed feed: channel metadata plus items in document order.
#[derive(Debug, Clone, Default)]
pub struct FeedDocument {
    pub title: String,
    pub description: String,
    pub items: Vec<FeedItem>,
}

/// One feed entry, pre-normalization.
#[derive(Debug, Clone, Default)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    /// Full content when the feed provides one (`content:encoded` / Atom
    /// `content`); empty otherwise.
    pub content: String,
    pub link: String,
    pub pub_date: String,
    pub author: String,
    pub guid: String,
    pub categories: Vec<String>,
}

impl FeedItem {
    fn is_blank(&self) -> bool {
        self.title.is_empty() && self.description.is_empty()
    }

    /// Convert into the canonical item shape, preferring full content for
    /// the body.
    #[must_use]
    pub fn into_canonical(self) -> CanonicalItem {
        let body = if self.content.is_empty() {
            self.description.clone()
        } else {
            self.content
        };
        CanonicalItem {
            title: self.title,
            body,
            summary: (!self.description.is_empty()).then_some(self.description),
            link: (!self.link.is_empty()).then_some(self.link),
            guid: (!self.guid.is_empty()).then_some(self.guid),
            author: (!self.author.is_empty()).then_some(self.author),
            published_at: parse_feed_date(&self.pub_date),
            categories: self.categories,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Rss,
    Atom,
}

/// Parse raw feed XML into a [`FeedDocument`], auto-detecting the dialect.
///
/// # Errors
///
/// - [`IngestError::UnrecognizedFormat`] if the root element is neither
///   `<rss>`/`<channel>` nor `<feed>`.
/// - [`IngestError::MissingFeedRoot`] if the dialect root lacks its
///   required child (`channel` for RSS).
/// - [`IngestError::Xml`] on malformed XML.
pub fn parse_feed(xml: &str) -> Result<FeedDocument, IngestError> {
    match detect_dialect(xml)? {
        Dialect::Rss => parse_rss(xml),
        Dialect::Atom => parse_atom(xml),
    }
}

fn detect_dialect(xml: &str) -> Result<Dialect, IngestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                let name = local_name(e.name().as_ref());
                return match name.as_str() {
                    "rss" | "channel" => Ok(Dialect::Rss),
                    "feed" => Ok(Dialect::Atom),
                    _ => Err(IngestError::UnrecognizedFormat),
                };
            }
            Ok(Event::Eof) => return Err(IngestError::UnrecognizedFormat),
            Err(e) => return Err(IngestError::Xml(e)),
            _ => {}
        }
    }
}

/// Element name as UTF-8, including any namespace prefix
/// (`content:encoded`, `dc:creator`).
fn local_name(raw: &[u8]) -> String {
    std::str::from_utf8(raw).unwrap_or("").to_string()
}

fn parse_rss(xml: &str) -> Result<FeedDocument, IngestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut doc = FeedDocument::default();
    let mut saw_channel = false;
    let mut in_item = false;
    let mut current_tag = String::new();
    let mut item = FeedItem::default();
    let mut dc_creator = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(e.name().as_ref());
                match name.as_str() {
                    "channel" => saw_channel = true,
                    "item" => {
                        in_item = true;
                        item = FeedItem::default();
                        dc_creator.clear();
                    }
                    _ => current_tag = name,
                }
            }
            Ok(Event::End(e)) => {
                let raw = e.name();
                let name = local_name(raw.as_ref());
                if name == "item" && in_item {
                    in_item = false;
                    if item.author.is_empty() {
                        item.author = std::mem::take(&mut dc_creator);
                    }
                    if item.is_blank() {
                        tracing::debug!("dropping feed item with no title or description");
                    } else {
                        doc.items.push(std::mem::take(&mut item));
                    }
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().into_owned();
                assign_rss_field(
                    &mut doc,
                    &mut item,
                    &mut dc_creator,
                    in_item,
                    &current_tag,
                    text,
                );
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                assign_rss_field(
                    &mut doc,
                    &mut item,
                    &mut dc_creator,
                    in_item,
                    &current_tag,
                    text,
                );
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(IngestError::Xml(e)),
            _ => {}
        }
    }

    if !saw_channel {
        return Err(IngestError::MissingFeedRoot {
            dialect: "RSS",
            element: "channel",
        });
    }

    Ok(doc)
}

fn assign_rss_field(
    doc: &mut FeedDocument,
    item: &mut FeedItem,
    dc_creator: &mut String,
    in_item: bool,
    tag: &str,
    text: String,
) {
    if in_item {
        match tag {
            "title" => item.title = text,
            "description" => item.description = strip_html(&text),
            "content:encoded" => item.content = text.trim().to_string(),
            "link" => item.link = text,
            "pubDate" => item.pub_date = text,
            "author" => item.author = text,
            "dc:creator" => *dc_creator = text,
            "guid" => item.guid = text,
            "category" => item.categories.push(text.trim().to_string()),
            _ => {}
        }
    } else {
        match tag {
            "title" if doc.title.is_empty() => doc.title = text,
            "description" if doc.description.is_empty() => doc.description = strip_html(&text),
            _ => {}
        }
    }
}

fn parse_atom(xml: &str) -> Result<FeedDocument, IngestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut doc = FeedDocument::default();
    let mut in_entry = false;
    let mut in_author = false;
    let mut current_tag = String::new();
    let mut item = FeedItem::default();
    // `updated` is only a fallback when `published` is absent.
    let mut published = String::new();
    let mut updated = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                let name = local_name(e.name().as_ref());
                match name.as_str() {
                    "entry" => {
                        in_entry = true;
                        item = FeedItem::default();
                        published.clear();
                        updated.clear();
                    }
                    "author" => in_author = true,
                    "link" => {
                        if in_entry {
                            let (href, rel) = link_attrs(&e);
                            if let Some(href) = href {
                                // rel="alternate" (or no rel) wins over service links.
                                if rel.as_deref().is_none_or(|r| r == "alternate")
                                    || item.link.is_empty()
                                {
                                    item.link = href;
                                }
                            }
                        }
                    }
                    "category" => {
                        if in_entry {
                            if let Some(term) = attr_value(&e, b"term") {
                                item.categories.push(term);
                            }
                        }
                        current_tag = name;
                    }
                    _ => current_tag = name,
                }
            }
            Ok(Event::End(e)) => {
                let raw = e.name();
                let name = local_name(raw.as_ref());
                match name.as_str() {
                    "entry" if in_entry => {
                        in_entry = false;
                        item.pub_date = if published.is_empty() {
                            std::mem::take(&mut updated)
                        } else {
                            std::mem::take(&mut published)
                        };
                        if item.is_blank() {
                            tracing::debug!("dropping feed entry with no title or summary");
                        } else {
                            doc.items.push(std::mem::take(&mut item));
                        }
                    }
                    "author" => in_author = false,
                    _ => {}
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().into_owned();
                assign_atom_field(
                    &mut doc,
                    &mut item,
                    &mut published,
                    &mut updated,
                    in_entry,
                    in_author,
                    &current_tag,
                    text,
                );
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                assign_atom_field(
                    &mut doc,
                    &mut item,
                    &mut published,
                    &mut updated,
                    in_entry,
                    in_author,
                    &current_tag,
                    text,
                );
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(IngestError::Xml(e)),
            _ => {}
        }
    }

    Ok(doc)
}

#[allow(clippy::too_many_arguments)]
fn assign_atom_field(
    doc: &mut FeedDocument,
    item: &mut FeedItem,
    published: &mut String,
    updated: &mut String,
    in_entry: bool,
    in_author: bool,
    tag: &str,
    text: String,
) {
    if in_entry {
        match tag {
            "title" => item.title = text,
            "summary" => item.description = strip_html(&text),
            "content" => item.content = text.trim().to_string(),
            "id" => item.guid = text,
            "published" => *published = text,
            "updated" => *updated = text,
            "name" if in_author => item.author = text,
            _ => {}
        }
    } else {
        match tag {
            "title" if doc.title.is_empty() => doc.title = text,
            "subtitle" if doc.description.is_empty() => doc.description = strip_html(&text),
            _ => {}
        }
    }
}

fn link_attrs(e: &quick_xml::events::BytesStart<'_>) -> (Option<String>, Option<String>) {
    let mut href = None;
    let mut rel = None;
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"href" => href = Some(value),
            b"rel" => rel = Some(value),
            _ => {}
        }
    }
    (href, rel)
}

fn attr_value(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Strip HTML tags from a string, returning plain text.
fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Regional Security Wire</title>
    <description>Daily monitoring digest</description>
    <item>
      <title>Pipeline facility reports outage</title>
      <description>&lt;p&gt;Short description here.&lt;/p&gt;</description>
      <content:encoded><![CDATA[Full article body with much more detail.]]></content:encoded>
      <link>https://wire.example/outage</link>
      <pubDate>Tue, 30 Jul 2025 10:30:00 GMT</pubDate>
      <dc:creator>Field Desk</dc:creator>
      <guid>wire-outage-1</guid>
      <category>energy</category>
      <category>infrastructure</category>
    </item>
    <item>
      <title>Second story</title>
      <description>Only a description, no full content.</description>
      <link>https://wire.example/second</link>
      <guid>wire-second-2</guid>
    </item>
    <item>
      <link>https://wire.example/empty</link>
    </item>
  </channel>
</rss>"#;

    const SAMPLE_ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Alert Stream</title>
  <subtitle>Automated alerts</subtitle>
  <link href="https://alerts.example/" rel="self"/>
  <entry>
    <title>Access badge anomaly flagged</title>
    <summary>Summary text.</summary>
    <content type="html">Full entry content body.</content>
    <link rel="alternate" href="https://alerts.example/badge-1"/>
    <id>urn:alert:badge-1</id>
    <published>2025-07-30T08:00:00Z</published>
    <updated>2025-07-30T09:00:00Z</updated>
    <author><name>Alert Bot</name></author>
    <category term="insider"/>
  </entry>
</feed>"#;

    #[test]
    fn rss_feed_parses_channel_metadata() {
        let doc = parse_feed(SAMPLE_RSS).expect("should parse RSS");
        assert_eq!(doc.title, "Regional Security Wire");
        assert_eq!(doc.description, "Daily monitoring digest");
    }

    #[test]
    fn rss_content_encoded_overrides_description() {
        let doc = parse_feed(SAMPLE_RSS).expect("should parse RSS");
        let item = &doc.items[0];
        assert_eq!(item.content, "Full article body with much more detail.");
        assert_eq!(item.description, "Short description here.");

        let canonical = item.clone().into_canonical();
        assert_eq!(canonical.body, "Full article body with much more detail.");
        assert_eq!(canonical.summary.as_deref(), Some("Short description here."));
    }

    #[test]
    fn rss_description_is_body_when_no_content() {
        let doc = parse_feed(SAMPLE_RSS).expect("should parse RSS");
        let canonical = doc.items[1].clone().into_canonical();
        assert_eq!(canonical.body, "Only a description, no full content.");
    }

    #[test]
    fn rss_items_without_title_or_description_are_dropped() {
        let doc = parse_feed(SAMPLE_RSS).expect("should parse RSS");
        assert_eq!(doc.items.len(), 2, "blank third item must be dropped");
    }

    #[test]
    fn rss_dc_creator_fills_missing_author() {
        let doc = parse_feed(SAMPLE_RSS).expect("should parse RSS");
        assert_eq!(doc.items[0].author, "Field Desk");
    }

    #[test]
    fn rss_guid_and_categories_are_extracted() {
        let doc = parse_feed(SAMPLE_RSS).expect("should parse RSS");
        assert_eq!(doc.items[0].guid, "wire-outage-1");
        assert_eq!(doc.items[0].categories, vec!["energy", "infrastructure"]);
    }

    #[test]
    fn rss_pub_date_parses_rfc2822() {
        let doc = parse_feed(SAMPLE_RSS).expect("should parse RSS");
        let canonical = doc.items[0].clone().into_canonical();
        assert!(canonical.published_at.is_some());
    }

    #[test]
    fn atom_feed_parses() {
        let doc = parse_feed(SAMPLE_ATOM).expect("should parse Atom");
        assert_eq!(doc.title, "Alert Stream");
        assert_eq!(doc.description, "Automated alerts");
        assert_eq!(doc.items.len(), 1);
    }

    #[test]
    fn atom_content_overrides_summary() {
        let doc = parse_feed(SAMPLE_ATOM).expect("should parse Atom");
        let canonical = doc.items[0].clone().into_canonical();
        assert_eq!(canonical.body, "Full entry content body.");
        assert_eq!(canonical.summary.as_deref(), Some("Summary text."));
    }

    #[test]
    fn atom_alternate_link_and_id_extracted() {
        let doc = parse_feed(SAMPLE_ATOM).expect("should parse Atom");
        assert_eq!(doc.items[0].link, "https://alerts.example/badge-1");
        assert_eq!(doc.items[0].guid, "urn:alert:badge-1");
        assert_eq!(doc.items[0].author, "Alert Bot");
        assert_eq!(doc.items[0].categories, vec!["insider"]);
    }

    #[test]
    fn atom_prefers_published_over_updated() {
        let doc = parse_feed(SAMPLE_ATOM).expect("should parse Atom");
        assert_eq!(doc.items[0].pub_date, "2025-07-30T08:00:00Z");
    }

    #[test]
    fn unrecognized_root_is_an_error() {
        let result = parse_feed("<html><body>not a feed</body></html>");
        assert!(matches!(result, Err(IngestError::UnrecognizedFormat)));
    }

    #[test]
    fn rss_without_channel_is_an_error() {
        let result = parse_feed(r#"<rss version="2.0"></rss>"#);
        assert!(matches!(
            result,
            Err(IngestError::MissingFeedRoot {
                dialect: "RSS",
                element: "channel"
            })
        ));
    }

    #[test]
    fn empty_channel_yields_no_items() {
        let doc = parse_feed(r#"<rss version="2.0"><channel></channel></rss>"#)
            .expect("empty channel should parse");
        assert!(doc.items.is_empty());
    }

    #[test]
    fn strip_html_removes_tags() {
        assert_eq!(strip_html("<p>Hello <b>world</b></p>"), "Hello world");
    }
}
