// SPDX-FileCopyrightText: 2026 Contactdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./contactdesk.toml` > `~/.config/contactdesk/contactdesk.toml`
//! > `/etc/contactdesk/contactdesk.toml` with environment variable overrides via
//! the `CONTACTDESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::DeskConfig;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "CONTACTDESK_";

/// Config sections an environment variable may address.
const SECTIONS: &[&str] = &["server", "storage", "logging", "realtime", "webhooks"];

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/contactdesk/contactdesk.toml";
pub(crate) const LOCAL_CONFIG_FILE: &str = "contactdesk.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/contactdesk/contactdesk.toml` (system-wide)
/// 3. `~/.config/contactdesk/contactdesk.toml` (user XDG config)
/// 4. `./contactdesk.toml` (local directory)
/// 5. `CONTACTDESK_*` environment variables
pub fn load_config() -> Result<DeskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<DeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<DeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(DeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(DeskConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("contactdesk").join(LOCAL_CONFIG_FILE))
}

/// Environment provider mapping `CONTACTDESK_SECTION_KEY` to `section.key`.
///
/// Only the leading section name is split off, so keys containing
/// underscores stay intact: `CONTACTDESK_SERVER_BEARER_TOKEN` maps to
/// `server.bearer_token`.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_'))
            && !rest.is_empty()
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
