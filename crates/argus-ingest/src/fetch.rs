//! Feed fetching through a chain of relay proxies.
//!
//! Feed servers frequently sit behind cross-origin restrictions or block
//! direct clients, so raw bytes are retrieved through an ordered list of
//! proxy routes. The index of the last route that succeeded is remembered
//! and tried first on the next call; every route is still attempted before
//! a fetch is declared failed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use base64::Engine;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Client;

use crate::error::IngestError;

const FEED_ACCEPT: &str =
    "application/rss+xml, application/xml, text/xml, application/atom+xml";

/// One way of relaying a feed request.
#[derive(Debug, Clone)]
pub enum ProxyRoute {
    /// GET `base` + percent-encoded target URL; the response body is the
    /// feed verbatim.
    Prefix { base: String },
    /// GET `base` + percent-encoded target URL; the response is a JSON
    /// envelope `{"contents": ...}` whose payload may be a base64 data URL.
    JsonEnvelope { base: String },
    /// POST `{"url": target}` to `endpoint` with a bearer token.
    Authenticated { endpoint: String, token: String },
}

impl ProxyRoute {
    fn label(&self) -> &str {
        match self {
            ProxyRoute::Prefix { base } | ProxyRoute::JsonEnvelope { base } => base,
            ProxyRoute::Authenticated { endpoint, .. } => endpoint,
        }
    }
}

/// Retrieves raw feed text over HTTP via the configured proxy routes.
///
/// The only mutable state is the preferred-route index; fetches from
/// concurrent source workers may share one `FeedFetcher`.
pub struct FeedFetcher {
    client: Client,
    routes: Vec<ProxyRoute>,
    preferred: AtomicUsize,
}

impl FeedFetcher {
    /// Creates a fetcher with the given timeout, `User-Agent`, and route list.
    ///
    /// Routes are tried in order, starting from the remembered preferred
    /// index.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        routes: Vec<ProxyRoute>,
    ) -> Result<Self, IngestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            routes,
            preferred: AtomicUsize::new(0),
        })
    }

    /// Builds the route list from application config.
    ///
    /// The authenticated route is included only when both its endpoint and
    /// token are configured.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &argus_core::AppConfig) -> Result<Self, IngestError> {
        let mut routes = vec![
            ProxyRoute::Prefix {
                base: config.proxy_prefix_url.clone(),
            },
            ProxyRoute::JsonEnvelope {
                base: config.proxy_envelope_url.clone(),
            },
        ];
        if !config.proxy_auth_url.is_empty() {
            if let Some(token) = &config.proxy_auth_token {
                routes.push(ProxyRoute::Authenticated {
                    endpoint: config.proxy_auth_url.clone(),
                    token: token.clone(),
                });
            }
        }
        Self::new(config.fetch_timeout_secs, &config.fetch_user_agent, routes)
    }

    /// Fetches the feed at `url`, returning its raw text.
    ///
    /// Tries the preferred route first, then the rest in order. A route
    /// failure (transport error, non-2xx status, unusable envelope) moves on
    /// to the next route.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::AllProxiesFailed`] once every route has been
    /// tried without success.
    pub async fn fetch(&self, url: &str) -> Result<String, IngestError> {
        let total = self.routes.len();
        if total == 0 {
            return Err(IngestError::AllProxiesFailed {
                url: url.to_owned(),
                attempts: 0,
            });
        }

        let start = self.preferred.load(Ordering::Relaxed) % total;
        for offset in 0..total {
            let idx = (start + offset) % total;
            let route = &self.routes[idx];
            match self.try_route(route, url).await {
                Ok(body) => {
                    self.preferred.store(idx, Ordering::Relaxed);
                    tracing::debug!(url, proxy = route.label(), "feed fetched via proxy");
                    return Ok(body);
                }
                Err(e) => {
                    tracing::warn!(url, proxy = route.label(), error = %e, "proxy route failed");
                }
            }
        }

        Err(IngestError::AllProxiesFailed {
            url: url.to_owned(),
            attempts: total,
        })
    }

    async fn try_route(&self, route: &ProxyRoute, url: &str) -> Result<String, IngestError> {
        match route {
            ProxyRoute::Prefix { base } => {
                let proxy_url = format!("{base}{}", encode_target(url));
                let response = self
                    .client
                    .get(&proxy_url)
                    .header(reqwest::header::ACCEPT, FEED_ACCEPT)
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(IngestError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: proxy_url,
                    });
                }
                Ok(response.text().await?)
            }
            ProxyRoute::JsonEnvelope { base } => {
                let proxy_url = format!("{base}{}", encode_target(url));
                let response = self
                    .client
                    .get(&proxy_url)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(IngestError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: proxy_url,
                    });
                }
                let body = response.text().await?;
                unwrap_envelope(base, &body)
            }
            ProxyRoute::Authenticated { endpoint, token } => {
                let response = self
                    .client
                    .post(endpoint)
                    .bearer_auth(token)
                    .json(&serde_json::json!({ "url": url }))
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(IngestError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: endpoint.clone(),
                    });
                }
                Ok(response.text().await?)
            }
        }
    }
}

fn encode_target(url: &str) -> String {
    utf8_percent_encode(url, NON_ALPHANUMERIC).to_string()
}

/// Unwrap a JSON-envelope proxy response into the raw feed text.
///
/// The envelope is `{"contents": <string>}`; `contents` may be a
/// `data:<mime>;base64,<payload>` URL, in which case the payload is decoded.
fn unwrap_envelope(proxy: &str, body: &str) -> Result<String, IngestError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| IngestError::ProxyEnvelope {
            proxy: proxy.to_owned(),
            reason: format!("response is not JSON: {e}"),
        })?;

    let contents = value
        .get("contents")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| IngestError::ProxyEnvelope {
            proxy: proxy.to_owned(),
            reason: "missing \"contents\" field".to_owned(),
        })?;

    if let Some(data_url) = contents.strip_prefix("data:") {
        let payload = data_url
            .split_once(',')
            .map(|(_, p)| p)
            .ok_or_else(|| IngestError::ProxyEnvelope {
                proxy: proxy.to_owned(),
                reason: "data URL has no payload".to_owned(),
            })?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| IngestError::ProxyEnvelope {
                proxy: proxy.to_owned(),
                reason: format!("base64 decode failed: {e}"),
            })?;
        return String::from_utf8(bytes).map_err(|e| IngestError::ProxyEnvelope {
            proxy: proxy.to_owned(),
            reason: format!("decoded payload is not UTF-8: {e}"),
        });
    }

    Ok(contents.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_target_escapes_reserved_characters() {
        let encoded = encode_target("https://feed.example/rss?a=b&c=d");
        assert!(!encoded.contains('/'));
        assert!(!encoded.contains('?'));
        assert!(!encoded.contains('&'));
        assert!(encoded.contains("%3A%2F%2F"));
    }

    #[test]
    fn unwrap_envelope_returns_plain_contents() {
        let body = r#"{"contents": "<rss version=\"2.0\"></rss>"}"#;
        let text = unwrap_envelope("proxy", body).expect("should unwrap");
        assert_eq!(text, "<rss version=\"2.0\"></rss>");
    }

    #[test]
    fn unwrap_envelope_decodes_base64_data_url() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("<rss/>");
        let body = format!(r#"{{"contents": "data:application/xml;base64,{encoded}"}}"#);
        let text = unwrap_envelope("proxy", &body).expect("should decode");
        assert_eq!(text, "<rss/>");
    }

    #[test]
    fn unwrap_envelope_rejects_non_json() {
        let result = unwrap_envelope("proxy", "not json at all");
        assert!(matches!(result, Err(IngestError::ProxyEnvelope { .. })));
    }

    #[test]
    fn unwrap_envelope_rejects_missing_contents() {
        let result = unwrap_envelope("proxy", r#"{"status": {"http_code": 200}}"#);
        assert!(matches!(result, Err(IngestError::ProxyEnvelope { .. })));
    }

    #[test]
    fn unwrap_envelope_rejects_bad_base64() {
        let result = unwrap_envelope("proxy", r#"{"contents": "data:text/xml;base64,@@@"}"#);
        assert!(matches!(result, Err(IngestError::ProxyEnvelope { .. })));
    }
}
