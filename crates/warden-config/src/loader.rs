// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Merge order (later overrides earlier):
//! 1. Compiled defaults
//! 2. `warden.toml` in the working directory, or the file named by `WARDEN_CONFIG`
//! 3. `TELEGRAM_*`, `SERVER_*`, `LOGS_*`, `STORAGE_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WardenConfig;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "warden.toml";

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "WARDEN_CONFIG";

/// Top-level sections; an env var `SECTION_KEY` maps to `section.key`.
const SECTIONS: &[&str] = &["telegram", "server", "logs", "storage"];

/// Recognized environment variables (lowercase, as figment reports them).
///
/// Anything else in the environment is ignored, so unrelated variables such
/// as `SERVER_SOFTWARE` never trip `deny_unknown_fields`.
pub const ENV_KEYS: &[&str] = &[
    "telegram_token",
    "telegram_admin_ids",
    "telegram_debug",
    "server_max_requests_per_user",
    "server_notify_dedup_ttl_secs",
    "server_pending_page_size",
    "logs_level",
    "logs_is_pretty",
    "logs_with_context",
    "logs_with_sources",
    "storage_backend",
    "storage_sqlite_path",
    "storage_wal_mode",
];

/// Path of the TOML layer: `$WARDEN_CONFIG` or `./warden.toml`.
pub fn config_file_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load configuration from defaults, the TOML layer, and the environment.
pub fn load_config() -> Result<WardenConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file, no environment).
pub fn load_config_from_str(toml_content: &str) -> Result<WardenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WardenConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WardenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WardenConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WardenConfig::default()))
        .merge(Toml::file(config_file_path()))
        .merge(env_provider())
}

/// Maps a lowercase env key such as `telegram_admin_ids` to `telegram.admin_ids`.
///
/// Only the first underscore after a known section is replaced; key names
/// keep their own underscores.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")`: `TELEGRAM_ADMIN_IDS` must
/// become `telegram.admin_ids`, not `telegram.admin.ids`.
fn env_provider() -> Env {
    Env::raw()
        .only(ENV_KEYS)
        .map(|key| map_env_key(key.as_str()).into())
}
