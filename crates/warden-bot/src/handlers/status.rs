// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use warden_core::{Response, WardenError};

use crate::handler::{Call, Deps, Handler, Reply};
use crate::handlers::settle;
use crate::messages;

/// Shows the status of the user's latest application.
pub struct StatusHandler;

#[async_trait]
impl Handler for StatusHandler {
    fn name(&self) -> &'static str {
        "status"
    }

    async fn handle(&self, deps: &Deps, call: Call<'_>) -> Result<Reply, WardenError> {
        let text = match call
            .ctx
            .io(deps.stores.applications.last_application_of_user(call.user.id))
            .await
        {
            Ok(application) => {
                call.ctx.insert("application_id", application.id);
                messages::application_status(&application)
            }
            Err(e) if e.is_not_found() => messages::NO_APPLICATIONS.to_string(),
            Err(e) => return Err(e),
        };
        Ok(Reply::new(settle(call.state), Response::text(text)))
    }
}
