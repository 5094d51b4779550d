use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("proxy {proxy} returned an unusable envelope: {reason}")]
    ProxyEnvelope { proxy: String, reason: String },

    #[error("all {attempts} proxy routes failed for {url}")]
    AllProxiesFailed { url: String, attempts: usize },

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unrecognized feed format: neither RSS nor Atom root found")]
    UnrecognizedFormat,

    #[error("invalid {dialect} feed: missing {element} element")]
    MissingFeedRoot {
        dialect: &'static str,
        element: &'static str,
    },

    #[error("CSV must have at least a header row and one data row (got {lines} lines)")]
    CsvTooShort { lines: usize },
}
