// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long polling: feeds Telegram updates into the update pipeline.
//!
//! Each accepted update is handed to [`Dispatcher::spawn`], so the polling
//! loop never waits on a handler; per-user ordering is the dispatcher's
//! concern.

use teloxide::dispatching::{Dispatcher as PollingDispatcher, UpdateFilterExt};
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Message, Update as TgUpdate};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use warden_bot::Dispatcher;

use crate::convert;

async fn on_message(upd: TgUpdate, msg: Message, dispatcher: Dispatcher) -> ResponseResult<()> {
    if let Some(update) = convert::message_update(i64::from(upd.id.0), &msg) {
        dispatcher.spawn(update);
    }
    respond(())
}

async fn on_callback(
    upd: TgUpdate,
    query: CallbackQuery,
    dispatcher: Dispatcher,
) -> ResponseResult<()> {
    if let Some(update) = convert::callback_update(i64::from(upd.id.0), &query) {
        dispatcher.spawn(update);
    }
    respond(())
}

/// Polls until `cancel` fires, then stops fetching updates.
///
/// Updates already handed to the dispatcher keep running; drain them with
/// [`drain_in_flight`](warden_bot::shutdown::drain_in_flight).
pub async fn run_polling(bot: Bot, dispatcher: Dispatcher, cancel: CancellationToken) {
    let handler = dptree::entry()
        .branch(TgUpdate::filter_message().endpoint(on_message))
        .branch(TgUpdate::filter_callback_query().endpoint(on_callback));

    let mut polling = PollingDispatcher::builder(bot, handler)
        .dependencies(dptree::deps![dispatcher])
        .default_handler(|upd| async move {
            debug!(update_id = upd.id.0, "ignoring unsupported update");
        })
        .build();

    let token = polling.shutdown_token();
    tokio::spawn(async move {
        cancel.cancelled().await;
        match token.shutdown() {
            Ok(stopped) => {
                stopped.await;
                debug!("telegram polling stopped");
            }
            Err(e) => debug!(error = %e, "telegram polling was not running"),
        }
    });

    info!("starting Telegram long polling");
    polling.dispatch().await;
    info!("Telegram long polling finished");
}
