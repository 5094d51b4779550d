//! HTTP client for the external AI provider.
//!
//! Speaks a messages-style completion API: the analyst prompt goes up as a
//! single user message, the structured classification comes back as text in
//! the first content block. The provider is treated as unreliable —
//! timeouts, quota errors, and malformed output all surface as typed errors
//! for the queue's retry policy. No retries happen here.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use argus_core::{Classification, Pir};

use crate::error::ClassifyError;
use crate::prompt::build_prompt;
use crate::validate::parse_classification;

const API_VERSION: &str = "2023-06-01";

/// Client for the AI classification endpoint.
///
/// Use [`ProviderClient::new`] for production or point `api_url` at a mock
/// server in tests.
pub struct ProviderClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ProviderClient {
    /// Creates a provider client.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_url: &str,
        api_key: &str,
        model: &str,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, ClassifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.to_owned(),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            max_tokens,
        })
    }

    /// Submit one item for classification against the given PIR set.
    ///
    /// # Errors
    ///
    /// - [`ClassifyError::Http`] on network failure or timeout.
    /// - [`ClassifyError::Provider`] on a non-2xx response.
    /// - [`ClassifyError::InvalidResponse`] when the reply violates the
    ///   classification contract.
    pub async fn classify(
        &self,
        content: &str,
        source: &str,
        pirs: &[Pir],
    ) -> Result<Classification, ClassifyError> {
        let prompt = build_prompt(content, source, pirs);

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": 0.1,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            let message = argus_core::truncate_chars(&message, 500).to_string();
            return Err(ClassifyError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| ClassifyError::InvalidResponse {
                    reason: format!("provider envelope is not valid JSON: {e}"),
                })?;

        let text = envelope
            .content
            .first()
            .map(|block| block.text.as_str())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClassifyError::InvalidResponse {
                reason: "provider envelope has no text content".to_string(),
            })?;

        let allowed: Vec<String> = pirs.iter().map(|p| p.category_code.clone()).collect();
        parse_classification(text, &allowed)
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}
