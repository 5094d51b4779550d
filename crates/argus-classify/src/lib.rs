//! Classification of canonical items against Priority Intelligence
//! Requirements.
//!
//! The AI path submits item content plus the active PIR set to an external
//! model under a sliding-window rate limiter, then validates and truncates
//! the structured result. When no credential is configured the service
//! degrades to a deterministic keyword classifier so the pipeline keeps
//! moving instead of stalling.

pub mod error;
pub mod fallback;
pub mod prompt;
pub mod provider;
pub mod rate_limit;
pub mod service;
pub mod validate;

pub use error::ClassifyError;
pub use fallback::KeywordClassifier;
pub use provider::ProviderClient;
pub use rate_limit::RateLimiter;
pub use service::ClassificationService;
