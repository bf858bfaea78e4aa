use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub stripe_secret_key: SecretString,
    pub stripe_webhook_secret: SecretString,
    /// Allowed clock skew between the signature timestamp and now
    pub webhook_tolerance_secs: i64,
    pub cancellation_token_secret: SecretString,
    pub cancellation_token_ttl: time::Duration,
    /// Public site that hosts the donation pages; manage links point here.
    pub site_base_url: Url,
    pub cors_origin: HeaderValue,
    pub resend_api_key: SecretString,
    pub email_from: String,
    pub receipts_dir: String,
    /// Deadline for every processor and datastore call
    pub outbound_timeout: std::time::Duration,
    /// Enables the token denylist when set
    pub redis_url: Option<String>,
    pub log_file: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = get_env_default(
            "BIND_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3001)),
        );
        let database_url: String = get_env("DATABASE_URL");

        let stripe_secret_key = SecretString::new(get_env::<String>("STRIPE_SECRET_KEY").into());
        let stripe_webhook_secret =
            SecretString::new(get_env::<String>("STRIPE_WEBHOOK_SECRET").into());
        let webhook_tolerance_secs: i64 = get_env_default("WEBHOOK_TOLERANCE_SECS", 300);

        let cancellation_token_secret =
            SecretString::new(get_env::<String>("CANCELLATION_TOKEN_SECRET").into());
        let cancellation_token_ttl_hours: i64 = get_env_default("CANCELLATION_TOKEN_TTL_HOURS", 24);

        let site_base_url: Url = get_env("SITE_BASE_URL");
        let cors_origin_raw: String = get_env_default("CORS_ORIGIN", site_base_url.origin().ascii_serialization());
        let cors_origin = cors_origin_raw.parse().unwrap_or_else(|_| {
            tracing::warn!(value = %cors_origin_raw, "CORS_ORIGIN is not a valid header value, falling back to localhost");
            HeaderValue::from_static("http://localhost:3000")
        });

        let resend_api_key = SecretString::new(get_env::<String>("RESEND_API_KEY").into());
        let email_from: String = get_env("EMAIL_FROM");
        let receipts_dir: String = get_env_default("RECEIPTS_DIR", "receipts".to_string());

        let outbound_timeout_secs: u64 = get_env_default("OUTBOUND_TIMEOUT_SECS", 10);
        let redis_url: Option<String> = std::env::var("REDIS_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let log_file: String = get_env_default("LOG_FILE", "app.log".to_string());

        Self {
            bind_addr,
            database_url,
            stripe_secret_key,
            stripe_webhook_secret,
            webhook_tolerance_secs,
            cancellation_token_secret,
            cancellation_token_ttl: time::Duration::hours(cancellation_token_ttl_hours),
            site_base_url,
            cors_origin,
            resend_api_key,
            email_from,
            receipts_dir,
            outbound_timeout: std::time::Duration::from_secs(outbound_timeout_secs.max(1)),
            redis_url,
            log_file,
        }
    }
}
