// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that serde attributes cannot express.
//! All failures are collected rather than stopping at the first one.

use crate::diagnostic::ConfigError;
use crate::model::DeskConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &DeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if let Some(token) = &config.server.bearer_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "server.bearer_token must not be empty when set".to_string(),
        });
    }

    if let Some(url) = &config.server.public_base_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        errors.push(ConfigError::Validation {
            message: format!("server.public_base_url `{url}` must start with http:// or https://"),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    let level = config.logging.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.log_level `{}` must be one of: {}",
                config.logging.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.realtime.channel_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "realtime.channel_capacity must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&DeskConfig::default()).is_ok());
    }

    #[test]
    fn all_failures_are_collected() {
        let mut config = DeskConfig::default();
        config.server.host = "not a host!".into();
        config.storage.database_path = "  ".into();
        config.logging.log_level = "loud".into();
        config.realtime.channel_capacity = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn public_url_needs_http_scheme() {
        let mut config = DeskConfig::default();
        config.server.public_base_url = Some("desk.example.com".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("public_base_url"));

        config.server.public_base_url = Some("https://desk.example.com".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn blank_bearer_token_is_rejected() {
        let mut config = DeskConfig::default();
        config.server.bearer_token = Some(" ".into());
        assert!(validate_config(&config).is_err());
    }
}
