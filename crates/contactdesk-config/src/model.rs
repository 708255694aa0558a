// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for contactdesk.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level contactdesk configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeskConfig {
    /// HTTP listener and API authentication.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Realtime change feed settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Provider webhook secrets.
    #[serde(default)]
    pub webhooks: WebhookConfig,
}

impl DeskConfig {
    /// Copy of this configuration with every secret replaced by a marker.
    pub fn redacted(&self) -> Self {
        fn mask(value: &Option<String>) -> Option<String> {
            value.as_ref().map(|_| "<redacted>".to_string())
        }

        let mut copy = self.clone();
        copy.server.bearer_token = mask(&self.server.bearer_token);
        copy.webhooks.twilio_auth_token = mask(&self.webhooks.twilio_auth_token);
        copy.webhooks.vapi_secret = mask(&self.webhooks.vapi_secret);
        copy.webhooks.resend_signing_secret = mask(&self.webhooks.resend_signing_secret);
        copy
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the server to.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required on `/api/*` routes. Unset disables API auth.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Externally visible base URL, used to rebuild the URL Twilio signed.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            public_base_url: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("contactdesk").join("contactdesk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("contactdesk.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RealtimeConfig {
    /// Frames buffered per conversation before a slow subscriber lags.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    256
}

/// Secrets used to authenticate inbound provider webhooks.
///
/// A provider whose secret is unset accepts unsigned requests.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Twilio account auth token (HMAC-SHA1 request signatures).
    #[serde(default)]
    pub twilio_auth_token: Option<String>,

    /// Shared secret Vapi sends in the `x-vapi-secret` header.
    #[serde(default)]
    pub vapi_secret: Option<String>,

    /// Resend webhook signing secret (`whsec_...`).
    #[serde(default)]
    pub resend_signing_secret: Option<String>,
}
