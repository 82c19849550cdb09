// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-running bot process.
//!
//! Wires storage, the Telegram transport, the update dispatcher and the
//! admin notifier together, polls until SIGINT/SIGTERM, then drains
//! in-flight updates and pending notifications before closing storage.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use warden_bot::notify::QUEUE_CAPACITY;
use warden_bot::shutdown::{self, drain_in_flight};
use warden_bot::{AdminNotifier, AdminSet, Deps, Dispatcher, NotifyQueue, Settings, Stores};
use warden_config::model::{StorageBackend, StorageConfig};
use warden_config::{LogsConfig, WardenConfig};
use warden_core::{Adapter, HealthStatus, WardenError};
use warden_storage::{MemoryStore, SqliteStore};
use warden_telegram::TelegramTransport;

/// How long shutdown waits for in-flight updates.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// How long shutdown waits for queued admin notifications.
const NOTIFIER_TIMEOUT: Duration = Duration::from_secs(5);

/// The store driver selected by `storage.backend`.
enum Backend {
    Sqlite(Arc<SqliteStore>),
    Memory(Arc<MemoryStore>),
}

impl Backend {
    async fn open(config: &StorageConfig) -> Result<Self, WardenError> {
        match config.backend {
            StorageBackend::Sqlite => {
                let store = SqliteStore::open(config).await?;
                info!(path = %config.sqlite_path, "using SQLite storage");
                Ok(Self::Sqlite(Arc::new(store)))
            }
            StorageBackend::Memory => {
                warn!("using in-memory storage, data is lost on exit");
                Ok(Self::Memory(Arc::new(MemoryStore::new())))
            }
        }
    }

    fn stores(&self) -> Stores {
        match self {
            Self::Sqlite(store) => Stores::from_backend(store.clone()),
            Self::Memory(store) => Stores::from_backend(store.clone()),
        }
    }

    fn adapter(&self) -> &dyn Adapter {
        match self {
            Self::Sqlite(store) => store.as_ref(),
            Self::Memory(store) => store.as_ref(),
        }
    }

    async fn close(&self) -> Result<(), WardenError> {
        match self {
            Self::Sqlite(store) => store.shutdown().await,
            Self::Memory(_) => Ok(()),
        }
    }
}

/// Runs the bot until a shutdown signal arrives.
pub async fn run_serve(config: WardenConfig) -> Result<(), WardenError> {
    init_tracing(&config.logs, config.telegram.debug);

    info!(version = env!("CARGO_PKG_VERSION"), "starting warden");

    let backend = Backend::open(&config.storage).await?;
    check_health(backend.adapter()).await?;

    let transport = Arc::new(TelegramTransport::new(&config.telegram)?);
    check_health(transport.as_ref()).await?;

    let cancel = shutdown::install_signal_handler();

    let stores = backend.stores();
    let admins = AdminSet::new(config.telegram.admin_ids.iter().copied());
    let settings = Settings::from(&config.server);
    let (notify, rx) = NotifyQueue::channel(QUEUE_CAPACITY);

    let notifier = AdminNotifier::new(
        transport.clone(),
        stores.clone(),
        admins.clone(),
        settings.notify_dedup_ttl,
    );
    let notifier_cancel = CancellationToken::new();
    let mut notifier_task = tokio::spawn(notifier.run(rx, notifier_cancel.clone()));

    let deps = Deps {
        stores,
        admins,
        notify,
        settings,
    };
    let dispatcher = Dispatcher::new(deps, transport.clone(), cancel.clone())
        .with_context(config.logs.with_context);

    info!(admins = config.telegram.admin_ids.len(), "warden ready");
    warden_telegram::run_polling(transport.bot().clone(), dispatcher.clone(), cancel.clone())
        .await;

    // Polling may also end on its own; either way nothing new is accepted.
    cancel.cancel();
    drain_in_flight(dispatcher.tracker(), DRAIN_TIMEOUT).await;

    // Dropping the last queue sender lets the notifier finish what is queued.
    drop(dispatcher);
    match tokio::time::timeout(NOTIFIER_TIMEOUT, &mut notifier_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "admin notifier task failed"),
        Err(_) => {
            warn!("admin notifier did not finish in time, cancelling");
            notifier_cancel.cancel();
            if let Err(e) = notifier_task.await {
                error!(error = %e, "admin notifier task failed");
            }
        }
    }

    backend.close().await?;
    info!("warden shutdown complete");
    Ok(())
}

async fn check_health(adapter: &dyn Adapter) -> Result<(), WardenError> {
    match adapter.health_check().await? {
        HealthStatus::Healthy => {
            info!(adapter = adapter.name(), "adapter healthy");
            Ok(())
        }
        HealthStatus::Degraded(reason) => {
            warn!(adapter = adapter.name(), %reason, "adapter degraded");
            Ok(())
        }
        HealthStatus::Unhealthy(reason) => Err(WardenError::Backend {
            message: format!("{} is unhealthy: {reason}", adapter.name()),
            source: None,
        }),
    }
}

/// Filter directives used when `RUST_LOG` is not set.
fn default_filter(logs: &LogsConfig, telegram_debug: bool) -> String {
    let level = logs.level;
    let telegram = if telegram_debug {
        "debug".to_string()
    } else {
        level.to_string()
    };
    format!(
        "warden={level},warden_core={level},warden_config={level},warden_storage={level},\
         warden_bot={level},warden_telegram={telegram},warn"
    )
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides `logs.level`.
fn init_tracing(logs: &LogsConfig, telegram_debug: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(logs, telegram_debug)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_file(logs.with_sources)
        .with_line_number(logs.with_sources);

    if logs.is_pretty {
        builder.pretty().init();
    } else {
        builder
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use warden_config::LogLevel;
    use warden_core::UserStore;

    use super::*;

    #[test]
    fn default_filter_uses_configured_level() {
        let logs = LogsConfig {
            level: LogLevel::Warn,
            ..LogsConfig::default()
        };
        let filter = default_filter(&logs, false);
        assert!(filter.starts_with("warden=warn,"));
        assert!(filter.contains("warden_telegram=warn"));
        assert!(filter.ends_with(",warn"));
    }

    #[test]
    fn telegram_debug_lowers_transport_target_only() {
        let filter = default_filter(&LogsConfig::default(), true);
        assert!(filter.contains("warden_telegram=debug"));
        assert!(filter.contains("warden_bot=info"));
    }

    #[test]
    fn default_filter_parses_as_env_filter() {
        let filter = default_filter(&LogsConfig::default(), true);
        assert!(tracing_subscriber::EnvFilter::try_new(filter).is_ok());
    }

    #[tokio::test]
    async fn memory_backend_opens_healthy() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            ..StorageConfig::default()
        };
        let backend = Backend::open(&config).await.unwrap();
        assert_eq!(backend.adapter().name(), "memory");
        check_health(backend.adapter()).await.unwrap();
        backend.close().await.unwrap();
    }

    #[tokio::test]
    async fn sqlite_backend_opens_and_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            sqlite_path: dir.path().join("serve.db").to_string_lossy().to_string(),
            wal_mode: true,
        };
        let backend = Backend::open(&config).await.unwrap();
        assert_eq!(backend.adapter().name(), "sqlite");
        check_health(backend.adapter()).await.unwrap();

        let stores = backend.stores();
        assert!(stores.users.user_by_transport_id(1).await.unwrap_err().is_not_found());
        backend.close().await.unwrap();
    }
}
