//! Classification service facade.

use std::time::Duration;

use argus_core::{default_pirs, AppConfig, Classification, Pir};

use crate::error::ClassifyError;
use crate::fallback::KeywordClassifier;
use crate::provider::ProviderClient;
use crate::rate_limit::RateLimiter;

enum Backend {
    Provider(ProviderClient),
    Keyword(KeywordClassifier),
}

/// Submits items for classification, rate-limited on the AI path.
///
/// Built in provider mode when an API credential is configured; otherwise
/// in degraded keyword mode. Errors from the provider are returned to the
/// caller untouched — the processing queue owns retry and backoff.
pub struct ClassificationService {
    limiter: RateLimiter,
    backend: Backend,
}

impl ClassificationService {
    /// Build the service from application config.
    ///
    /// Missing or empty `ai_api_key` selects the keyword fallback and logs
    /// the degradation once at startup.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::Http`] if the provider HTTP client cannot be
    /// constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, ClassifyError> {
        let limiter = RateLimiter::new(
            config.rate_limit_max_per_minute,
            Duration::from_millis(config.rate_limit_spacing_ms),
        );

        let backend = match config.ai_api_key.as_deref() {
            Some(key) if !key.is_empty() => Backend::Provider(ProviderClient::new(
                &config.ai_api_url,
                key,
                &config.ai_model,
                config.ai_max_tokens,
                config.ai_timeout_secs,
            )?),
            _ => {
                tracing::warn!(
                    "no AI credential configured; classification degraded to keyword matching"
                );
                Backend::Keyword(KeywordClassifier)
            }
        };

        Ok(Self { limiter, backend })
    }

    /// Build a provider-mode service around an existing client (tests).
    #[must_use]
    pub fn with_provider(provider: ProviderClient, limiter: RateLimiter) -> Self {
        Self {
            limiter,
            backend: Backend::Provider(provider),
        }
    }

    /// Build a keyword-mode service.
    #[must_use]
    pub fn keyword_only() -> Self {
        Self {
            limiter: RateLimiter::new(usize::MAX, Duration::ZERO),
            backend: Backend::Keyword(KeywordClassifier),
        }
    }

    /// `true` when running on the keyword fallback instead of the provider.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self.backend, Backend::Keyword(_))
    }

    /// Classify one item against the active PIR set.
    ///
    /// An empty `pirs` slice degrades to the built-in default set rather
    /// than failing. The provider path suspends on the rate limiter first
    /// (up to ~60 s under sustained load).
    ///
    /// # Errors
    ///
    /// Propagates [`ClassifyError`] from the provider path; the keyword
    /// path is infallible.
    pub async fn classify(
        &self,
        content: &str,
        source: &str,
        pirs: &[Pir],
    ) -> Result<Classification, ClassifyError> {
        let defaults;
        let pirs: &[Pir] = if pirs.is_empty() {
            defaults = default_pirs();
            &defaults
        } else {
            pirs
        };

        match &self.backend {
            Backend::Provider(client) => {
                self.limiter.acquire().await;
                client.classify(content, source, pirs).await
            }
            Backend::Keyword(keyword) => Ok(keyword.classify(content, pirs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keyword_mode_classifies_without_a_provider() {
        let service = ClassificationService::keyword_only();
        assert!(service.is_degraded());

        let c = service
            .classify("sabotage of plant infrastructure", "test", &[])
            .await
            .expect("keyword path is infallible");
        assert!(c.relevant);
        assert_eq!(c.category, "sabotage");
    }

    #[tokio::test]
    async fn empty_pir_set_falls_back_to_defaults() {
        let service = ClassificationService::keyword_only();
        let c = service
            .classify("ukrainian frontline movement reported", "test", &[])
            .await
            .unwrap();
        assert_eq!(c.category, "ukraine", "default PIR set must be applied");
    }
}
