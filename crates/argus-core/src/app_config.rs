use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub bootstrap_path: PathBuf,

    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    pub fetch_timeout_secs: u64,
    pub fetch_user_agent: String,
    /// GET proxy that returns the target body verbatim.
    pub proxy_prefix_url: String,
    /// GET proxy that wraps the target body in a JSON envelope.
    pub proxy_envelope_url: String,
    /// Authenticated POST proxy; skipped when `proxy_auth_token` is unset.
    pub proxy_auth_url: String,
    pub proxy_auth_token: Option<String>,

    pub ai_api_url: String,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_max_tokens: u32,
    pub ai_timeout_secs: u64,
    pub rate_limit_max_per_minute: usize,
    pub rate_limit_spacing_ms: u64,

    pub worker_count: usize,
    pub worker_poll_interval_secs: u64,
    pub queue_retry_backoff_base_secs: u64,
    pub scheduler_reconcile_cron: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("bootstrap_path", &self.bootstrap_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("fetch_user_agent", &self.fetch_user_agent)
            .field("proxy_prefix_url", &self.proxy_prefix_url)
            .field("proxy_envelope_url", &self.proxy_envelope_url)
            .field("proxy_auth_url", &self.proxy_auth_url)
            .field(
                "proxy_auth_token",
                &self.proxy_auth_token.as_ref().map(|_| "[redacted]"),
            )
            .field("ai_api_url", &self.ai_api_url)
            .field("ai_api_key", &self.ai_api_key.as_ref().map(|_| "[redacted]"))
            .field("ai_model", &self.ai_model)
            .field("ai_max_tokens", &self.ai_max_tokens)
            .field("ai_timeout_secs", &self.ai_timeout_secs)
            .field("rate_limit_max_per_minute", &self.rate_limit_max_per_minute)
            .field("rate_limit_spacing_ms", &self.rate_limit_spacing_ms)
            .field("worker_count", &self.worker_count)
            .field("worker_poll_interval_secs", &self.worker_poll_interval_secs)
            .field(
                "queue_retry_backoff_base_secs",
                &self.queue_retry_backoff_base_secs,
            )
            .field("scheduler_reconcile_cron", &self.scheduler_reconcile_cron)
            .finish()
    }
}
