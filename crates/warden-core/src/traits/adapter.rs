// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by every store and transport adapter.

use async_trait::async_trait;

use crate::error::WardenError;
use crate::types::HealthStatus;

/// Identity and health of a pluggable backend.
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Probes the backend and reports its current status.
    async fn health_check(&self) -> Result<HealthStatus, WardenError>;
}
