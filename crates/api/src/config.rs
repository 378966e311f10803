use serde::{Deserialize, Serialize};

/// Backend for the ephemeral stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KvBackend {
    #[default]
    Redis,
    /// In-process map. State is lost on restart and not shared between replicas.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Required unless `kv_backend` is `memory`.
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default)]
    pub kv_backend: KvBackend,
    /// SMTP URL for development email (e.g., smtp://localhost:1025)
    #[serde(default)]
    pub smtp_url: Option<String>,
    /// Resend API key for production email
    #[serde(default)]
    pub resend_api_key: Option<String>,
    /// From address for outgoing email.
    #[serde(default = "default_sender_email")]
    pub sender_email: String,
    /// HMAC key for signing access and refresh tokens.
    pub jwt_secret: String,
    /// Fail reset code requests when the email can't be delivered,
    /// instead of logging the failure and responding as usual.
    #[serde(default)]
    pub strict_email_delivery: bool,
    /// Set to "production" for JSON logging, anything else for human-readable.
    #[serde(default)]
    pub env: String,
    /// Sentry DSN for error tracking
    #[serde(default)]
    pub sentry_dsn: Option<String>,
}

fn default_sender_email() -> String {
    "tunes <noreply@tunes.local>".to_string()
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }
}
