// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User identity types and text helpers shared across the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of code points kept for each profile name field.
pub const NAME_MAX_CHARS: usize = 64;

/// Health status reported by store and transport health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Fully operational.
    Healthy,
    /// Operational but experiencing issues.
    Degraded(String),
    /// Not operational.
    Unhealthy(String),
}

/// The sender of an update as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub transport_id: i64,
    pub chat_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl Profile {
    /// Returns a copy with every name field truncated to [`NAME_MAX_CHARS`].
    pub fn truncated(&self) -> Profile {
        Profile {
            transport_id: self.transport_id,
            chat_id: self.chat_id,
            first_name: self.first_name.as_deref().map(|s| truncate_chars(s, NAME_MAX_CHARS)),
            last_name: self.last_name.as_deref().map(|s| truncate_chars(s, NAME_MAX_CHARS)),
            username: self.username.as_deref().map(|s| truncate_chars(s, NAME_MAX_CHARS)),
        }
    }
}

/// A persisted user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal, time-ordered identifier.
    pub id: Uuid,
    /// Identifier assigned by the chat transport; unique per deployment.
    pub transport_id: i64,
    /// Private chat used to reach the user.
    pub chat_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds a new user from a transport profile, truncating names on ingest.
    pub fn from_profile(profile: &Profile, now: DateTime<Utc>) -> Self {
        let profile = profile.truncated();
        Self {
            id: Uuid::now_v7(),
            transport_id: profile.transport_id,
            chat_id: profile.chat_id,
            first_name: profile.first_name,
            last_name: profile.last_name,
            username: profile.username,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` when the (truncated) profile carries different data.
    pub fn differs_from(&self, profile: &Profile) -> bool {
        let profile = profile.truncated();
        self.chat_id != profile.chat_id
            || self.first_name != profile.first_name
            || self.last_name != profile.last_name
            || self.username != profile.username
    }

    /// Copies the mutable profile fields onto this user.
    pub fn apply_profile(&mut self, profile: &Profile) {
        let profile = profile.truncated();
        self.chat_id = profile.chat_id;
        self.first_name = profile.first_name;
        self.last_name = profile.last_name;
        self.username = profile.username;
    }

    /// Human readable label: `@username` when known, otherwise the full name.
    pub fn display_name(&self) -> String {
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            return format!("@{username}");
        }
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            format!("id{}", self.transport_id)
        } else {
            full
        }
    }
}

/// Truncates `s` to at most `max` Unicode scalar values.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Number of Unicode scalar values in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}
