//! Shared configuration and domain types for the argus intelligence pipeline.

use thiserror::Error;

pub mod app_config;
pub mod bootstrap;
pub mod config;
pub mod pirs;
pub mod types;

pub use app_config::{AppConfig, Environment};
pub use bootstrap::{load_bootstrap, BootstrapFile, PirConfig, SourceConfig};
pub use config::{load_app_config, load_app_config_from_env};
pub use pirs::{default_pirs, Pir};
pub use types::{
    truncate_chars, Classification, Decision, Priority, QueueStatus, SourceKind,
    QUOTE_MAX_CHARS, REASONING_MAX_CHARS, SUMMARY_MAX_CHARS, TAGS_MAX, TITLE_MAX_CHARS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read bootstrap file {path}: {source}")]
    BootstrapFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse bootstrap file: {0}")]
    BootstrapFileParse(#[from] serde_yaml::Error),

    #[error("bootstrap validation failed: {0}")]
    Validation(String),
}
