// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the constraints serde cannot express: required values, lower
//! bounds, and backend-specific settings.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{StorageBackend, WardenConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WardenConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    match config.telegram.token.as_deref() {
        None => errors.push(ConfigError::MissingKey {
            key: "telegram.token".to_string(),
            env: "TELEGRAM_TOKEN".to_string(),
        }),
        Some(token) if token.trim().is_empty() => errors.push(ConfigError::Validation {
            message: "telegram.token must not be empty".to_string(),
        }),
        Some(_) => {}
    }

    if config.telegram.admin_ids.is_empty() {
        errors.push(ConfigError::MissingKey {
            key: "telegram.admin_ids".to_string(),
            env: "TELEGRAM_ADMIN_IDS".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for id in &config.telegram.admin_ids {
        if *id == 0 {
            errors.push(ConfigError::Validation {
                message: "telegram.admin_ids must not contain 0".to_string(),
            });
        }
        if !seen.insert(id) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate admin id `{id}` in telegram.admin_ids"),
            });
        }
    }

    if config.server.max_requests_per_user < 1 {
        errors.push(ConfigError::Validation {
            message: "server.max_requests_per_user must be at least 1".to_string(),
        });
    }

    if config.server.pending_page_size < 1 {
        errors.push(ConfigError::Validation {
            message: "server.pending_page_size must be at least 1".to_string(),
        });
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.sqlite_path.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "storage.sqlite_path must not be empty when storage.backend is sqlite"
                .to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
