use thiserror::Error;

/// Errors returned by the classification service.
///
/// None of these are retried internally; the queue worker owns the retry
/// and backoff policy.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("provider error: HTTP {status}: {message}")]
    Provider { status: u16, message: String },

    /// No API credential configured; the AI path is unavailable.
    #[error("AI provider credential not configured")]
    MissingCredentials,

    /// The provider's output violates the classification contract.
    #[error("invalid classifier response: {reason}")]
    InvalidResponse { reason: String },
}
