// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Warden approval bot.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! environment variable overrides (`TELEGRAM_*`, `SERVER_*`, `LOGS_*`, `STORAGE_*`),
//! and miette diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use warden_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("admins: {:?}", config.telegram.admin_ids);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{LogLevel, LogsConfig, StorageBackend, WardenConfig};

/// Load configuration from defaults, `warden.toml` and the environment, then validate it.
///
/// On a Figment error the TOML layer is re-read so that unknown keys can be
/// pointed at in the source.
pub fn load_and_validate() -> Result<WardenConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            tracing::debug!(
                admins = config.telegram.admin_ids.len(),
                backend = ?config.storage.backend,
                "configuration loaded"
            );
            Ok(config)
        }
        Err(err) => {
            let path = loader::config_file_path();
            let content = std::fs::read_to_string(&path).ok();
            let name = path.display().to_string();
            let source = content.as_deref().map(|c| (name.as_str(), c));
            Err(diagnostic::figment_to_config_errors(err, source))
        }
    }
}

/// Like [`load_and_validate`], but reads the TOML layer from `path`.
///
/// Environment variables still override the file.
pub fn load_and_validate_at(path: &std::path::Path) -> Result<WardenConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let content = std::fs::read_to_string(path).ok();
            let name = path.display().to_string();
            let source = content.as_deref().map(|c| (name.as_str(), c));
            Err(diagnostic::figment_to_config_errors(err, source))
        }
    }
}

/// Load configuration from a specific TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<WardenConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            Some(("<inline>", toml_content)),
        )),
    }
}
