//! Content ingestion for argus.
//!
//! Fetches raw feed bytes through a chain of CORS-relay proxies, parses
//! RSS 2.0 and Atom documents into a canonical feed shape, parses
//! delimiter-separated uploads, and normalizes everything into
//! [`CanonicalItem`]s carrying a stable content hash for deduplication.

pub mod csv;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod types;

pub use csv::parse_csv;
pub use error::IngestError;
pub use feed::{parse_feed, FeedDocument, FeedItem};
pub use fetch::{FeedFetcher, ProxyRoute};
pub use types::CanonicalItem;
