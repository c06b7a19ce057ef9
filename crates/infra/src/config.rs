//! Process configuration, loaded from environment variables.
//!
//! Every variable has a default; only values that are present but unusable
//! are errors.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use stocksync_inventory::MAX_BATCH_SIZE;
use stocksync_observability::LogFormat;

use crate::sync_engine::SyncSettings;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// How to reach and talk to storefront admin APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Version segment of the admin API path, e.g. `2025-01`.
    pub api_version: String,
    pub timeout: Duration,
    /// `reason` sent with every inventory adjustment.
    pub adjustment_reason: String,
    /// Base URL template; `{shop}` is replaced with the store's domain.
    /// Defaults to `https://{shop}`.
    pub base_url: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_version: "2025-01".to_string(),
            timeout: Duration::from_millis(10_000),
            adjustment_reason: "correction".to_string(),
            base_url: "https://{shop}".to_string(),
        }
    }
}

/// Names of the inbound webhook headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookHeaders {
    pub shop_domain: String,
    pub signature: String,
    pub webhook_id: String,
}

impl Default for WebhookHeaders {
    fn default() -> Self {
        Self {
            shop_domain: "x-shopify-shop-domain".to_string(),
            signature: "x-shopify-hmac-sha256".to_string(),
            webhook_id: "x-shopify-webhook-id".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory repositories.
    pub database_url: Option<String>,
    pub remote: RemoteConfig,
    pub sync: SyncSettings,
    pub webhook_headers: WebhookHeaders,
    pub log_format: LogFormat,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            remote: RemoteConfig::default(),
            sync: SyncSettings::default(),
            webhook_headers: WebhookHeaders::default(),
            log_format: LogFormat::Json,
        }
    }
}

impl SyncConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup (tests, embedding).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let bind_addr = match get("BIND_ADDR") {
            Some(v) => v
                .parse()
                .map_err(|e: std::net::AddrParseError| invalid("BIND_ADDR", &v, e.to_string()))?,
            None => defaults.bind_addr,
        };

        let timeout_ms: u64 = parse_or("REMOTE_TIMEOUT_MS", get("REMOTE_TIMEOUT_MS"), 10_000)?;
        if timeout_ms == 0 {
            return Err(invalid("REMOTE_TIMEOUT_MS", "0", "must be positive"));
        }

        let max_concurrency: usize = parse_or("SYNC_MAX_CONCURRENCY", get("SYNC_MAX_CONCURRENCY"), 4)?;
        let batch_size: usize = parse_or("SYNC_BATCH_SIZE", get("SYNC_BATCH_SIZE"), MAX_BATCH_SIZE)?;

        let log_format = match get("LOG_FORMAT") {
            Some(v) => v.parse().map_err(|e: stocksync_observability::UnknownLogFormat| {
                invalid("LOG_FORMAT", &v, e.to_string())
            })?,
            None => defaults.log_format,
        };

        let base_url = get("REMOTE_BASE_URL").unwrap_or(defaults.remote.base_url);
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(invalid("REMOTE_BASE_URL", &base_url, "must be an http(s) URL"));
        }

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            remote: RemoteConfig {
                api_version: get("REMOTE_API_VERSION").unwrap_or(defaults.remote.api_version),
                timeout: Duration::from_millis(timeout_ms),
                adjustment_reason: get("ADJUSTMENT_REASON").unwrap_or(defaults.remote.adjustment_reason),
                base_url,
            },
            sync: SyncSettings::new(max_concurrency, batch_size),
            webhook_headers: WebhookHeaders {
                shop_domain: get("WEBHOOK_SHOP_HEADER")
                    .map(|h| h.to_ascii_lowercase())
                    .unwrap_or(defaults.webhook_headers.shop_domain),
                signature: get("WEBHOOK_SIGNATURE_HEADER")
                    .map(|h| h.to_ascii_lowercase())
                    .unwrap_or(defaults.webhook_headers.signature),
                webhook_id: get("WEBHOOK_ID_HEADER")
                    .map(|h| h.to_ascii_lowercase())
                    .unwrap_or(defaults.webhook_headers.webhook_id),
            },
            log_format,
        })
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match raw {
        Some(v) => v.parse().map_err(|e: T::Err| invalid(key, &v, e.to_string())),
        None => Ok(default),
    }
}
