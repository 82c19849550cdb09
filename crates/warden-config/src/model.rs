// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Top-level Warden configuration.
///
/// Every section has defaults so that a partially configured environment
/// still deserializes; required values are enforced by
/// [`validate_config`](crate::validation::validate_config).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WardenConfig {
    /// Telegram transport settings (`TELEGRAM_*`).
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Workflow limits and notifier tuning (`SERVER_*`).
    #[serde(default)]
    pub server: ServerConfig,

    /// Log output settings (`LOGS_*`).
    #[serde(default)]
    pub logs: LogsConfig,

    /// Storage backend selection (`STORAGE_*`).
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Telegram transport configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot API token. Required.
    #[serde(default)]
    pub token: Option<String>,

    /// Transport ids of the administrators. At least one is required.
    ///
    /// Accepts an array (`[1, 2]`), a single integer, or a comma-separated
    /// string (`"1,2"`), which is what a plain environment variable yields.
    #[serde(default, deserialize_with = "deserialize_admin_ids")]
    pub admin_ids: Vec<i64>,

    /// Verbose transport logging.
    #[serde(default)]
    pub debug: bool,
}

/// Workflow limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Maximum number of applications a user may ever submit.
    #[serde(default = "default_max_requests_per_user")]
    pub max_requests_per_user: u32,

    /// How long an admin fan-out suppresses the next one, in seconds.
    #[serde(default = "default_notify_dedup_ttl_secs")]
    pub notify_dedup_ttl_secs: u64,

    /// Number of pending applications shown per admin listing.
    #[serde(default = "default_pending_page_size")]
    pub pending_page_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_requests_per_user: default_max_requests_per_user(),
            notify_dedup_ttl_secs: default_notify_dedup_ttl_secs(),
            pending_page_size: default_pending_page_size(),
        }
    }
}

fn default_max_requests_per_user() -> u32 {
    3
}

fn default_notify_dedup_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_pending_page_size() -> usize {
    5
}

/// Minimum severity of emitted log records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogsConfig {
    #[serde(default)]
    pub level: LogLevel,

    /// Human-readable output instead of JSON lines.
    #[serde(default)]
    pub is_pretty: bool,

    /// Wrap each update in a span carrying its request context.
    #[serde(default = "default_true")]
    pub with_context: bool,

    /// Include file and line of the emitting call site.
    #[serde(default)]
    pub with_sources: bool,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            is_pretty: false,
            with_context: true,
            with_sources: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Which persistence driver backs the stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Storage backend configuration. Only the selected backend's keys are read.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,

    /// Enable WAL journaling for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            sqlite_path: default_sqlite_path(),
            wal_mode: true,
        }
    }
}

fn default_sqlite_path() -> String {
    "warden.db".to_string()
}

fn deserialize_admin_ids<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<i64>),
        One(i64),
        Csv(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::List(ids) => Ok(ids),
        Raw::One(id) => Ok(vec![id]),
        Raw::Csv(s) => parse_id_list(&s).map_err(serde::de::Error::custom),
    }
}

/// Parses `"1, 2,3"` (optionally bracketed) into ids. Empty input yields none.
pub fn parse_id_list(s: &str) -> Result<Vec<i64>, String> {
    s.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|e| format!("invalid admin id `{part}`: {e}"))
        })
        .collect()
}
