// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Arbiter-facing handlers: pending listing and approve/decline callbacks.

use async_trait::async_trait;
use tracing::warn;
use warden_core::{
    Application, CallbackPayload, DecisionAction, Response, WardenError,
    response::{CallbackAnswer, EditMessage, InlineButton, Keyboard, OutgoingMessage},
};

use crate::handler::{Call, Deps, Handler, Reply};
use crate::handlers::settle;
use crate::messages;
use crate::workflow::{self, Decision};

/// Inline approve/decline buttons for `application`.
pub fn decision_keyboard(application: &Application) -> Keyboard {
    Keyboard::Inline(vec![vec![
        InlineButton::new(
            messages::BUTTON_APPROVE,
            CallbackPayload::new(application.id, DecisionAction::Approve).encode(),
        ),
        InlineButton::new(
            messages::BUTTON_DECLINE,
            CallbackPayload::new(application.id, DecisionAction::Decline).encode(),
        ),
    ]])
}

/// Lists pending applications, one message per application.
pub struct PendingListHandler;

#[async_trait]
impl Handler for PendingListHandler {
    fn name(&self) -> &'static str {
        "pending_list"
    }

    async fn handle(&self, deps: &Deps, call: Call<'_>) -> Result<Reply, WardenError> {
        let pending = call
            .ctx
            .io(deps
                .stores
                .applications
                .pending_applications_with_requester(deps.settings.pending_page_size))
            .await?;
        call.ctx.insert("pending", pending.len());

        let next = settle(call.state);
        if pending.is_empty() {
            return Ok(Reply::new(next, Response::text(messages::NO_PENDING)));
        }

        let response = pending.iter().fold(
            Response::text(messages::pending_header(pending.len())),
            |response, (application, requester)| {
                response.send(
                    OutgoingMessage::new(messages::application_card(application, requester))
                        .with_keyboard(decision_keyboard(application)),
                )
            },
        );
        Ok(Reply::new(next, response))
    }
}

/// Approves or declines the application named by the callback payload.
pub struct DecisionHandler {
    action: DecisionAction,
}

impl DecisionHandler {
    pub fn new(action: DecisionAction) -> Self {
        Self { action }
    }
}

#[async_trait]
impl Handler for DecisionHandler {
    fn name(&self) -> &'static str {
        match self.action {
            DecisionAction::Approve => "approve",
            DecisionAction::Decline => "decline",
        }
    }

    async fn handle(&self, deps: &Deps, call: Call<'_>) -> Result<Reply, WardenError> {
        let payload = match call.update.callback_payload() {
            Some(Ok(payload)) if payload.action == self.action => payload,
            Some(Ok(payload)) => {
                return Err(WardenError::InvalidState(format!(
                    "{} callback routed to {}",
                    payload.action,
                    self.name()
                )));
            }
            Some(Err(e)) => return Err(WardenError::Validation(e.into())),
            None => {
                return Err(WardenError::InvalidState(
                    "decision requires a callback".to_string(),
                ));
            }
        };

        let response = match workflow::decide(deps, call.ctx, call.user, payload).await? {
            Decision::AlreadyProcessed => {
                Response::new().answer(CallbackAnswer::text(messages::ALREADY_PROCESSED))
            }
            Decision::Decided {
                application,
                requester,
            } => {
                let answer = match self.action {
                    DecisionAction::Approve => messages::APPROVED_ANSWER,
                    DecisionAction::Decline => messages::DECLINED_ANSWER,
                };
                Response::new()
                    .answer(CallbackAnswer::text(answer))
                    .edit(EditMessage::origin(messages::decided_card(
                        &application,
                        &requester,
                        call.user,
                    )))
                    .send(
                        OutgoingMessage::new(messages::decision_notice(&application))
                            .to_chat(requester.chat_id),
                    )
            }
        };
        Ok(Reply::new(call.state, response))
    }
}

/// Catches every callback the admin routes did not take.
pub struct RejectCallbackHandler;

#[async_trait]
impl Handler for RejectCallbackHandler {
    fn name(&self) -> &'static str {
        "reject_callback"
    }

    async fn handle(&self, _deps: &Deps, call: Call<'_>) -> Result<Reply, WardenError> {
        match call.update.callback_payload() {
            Some(Err(e)) => Err(WardenError::Validation(e.into())),
            _ => {
                warn!(sender = call.update.sender_id(), "non-admin decision attempt");
                Err(WardenError::Unauthorized(format!(
                    "{} is not an administrator",
                    call.update.sender_id()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use warden_core::{
        ApplicationStatus, ApplicationStore, ConversationState, Update, response::Effect,
    };

    use super::*;
    use crate::handlers::fixture::{ADMIN, Fixture, profile};

    fn tap(id: i64, application: &Application, action: DecisionAction) -> Update {
        let data = CallbackPayload::new(application.id, action).encode();
        Update::callback(9, profile(id), "cb-1", Some(77), data)
    }

    #[tokio::test]
    async fn approve_commits_and_notifies_requester() {
        let fx = Fixture::new();
        let requester = fx.user(7).await;
        let admin = fx.user(ADMIN).await;
        let app = fx.store.create_application(requester.id, "Alice").await.unwrap();

        let handler = DecisionHandler::new(DecisionAction::Approve);
        let reply = fx
            .run(&handler, &tap(ADMIN, &app, DecisionAction::Approve), ConversationState::Idle)
            .await
            .unwrap();

        let stored = fx.store.application_by_id(app.id).await.unwrap();
        assert_eq!(stored.status, ApplicationStatus::Approved);
        assert_eq!(stored.arbiter_id, Some(admin.id));

        let effects = &reply.response.effects;
        assert!(matches!(&effects[0], Effect::Answer(a) if a.text.as_deref() == Some(messages::APPROVED_ANSWER)));
        assert!(matches!(&effects[1], Effect::Edit(_)));
        match &effects[2] {
            Effect::Send(m) => {
                assert_eq!(m.chat_id, Some(requester.chat_id));
                assert!(m.text.contains("одобрена"));
            }
            other => panic!("expected send, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn decline_uses_default_reason_and_second_tap_is_noop() {
        let fx = Fixture::new();
        let requester = fx.user(7).await;
        let app = fx.store.create_application(requester.id, "Alice").await.unwrap();
        let handler = DecisionHandler::new(DecisionAction::Decline);
        let update = tap(ADMIN, &app, DecisionAction::Decline);

        fx.run(&handler, &update, ConversationState::Idle).await.unwrap();
        let first = fx.store.application_by_id(app.id).await.unwrap();
        assert_eq!(first.status, ApplicationStatus::Declined);
        assert_eq!(
            first.decline_reason.as_deref(),
            Some(warden_core::application::DEFAULT_DECLINE_REASON)
        );

        let approve = DecisionHandler::new(DecisionAction::Approve);
        let reply = fx
            .run(&approve, &tap(ADMIN, &app, DecisionAction::Approve), ConversationState::Idle)
            .await
            .unwrap();
        assert_eq!(
            reply.response,
            Response::new().answer(CallbackAnswer::text(messages::ALREADY_PROCESSED))
        );
        assert_eq!(fx.store.application_by_id(app.id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn unknown_application_is_not_found() {
        let fx = Fixture::new();
        let requester = fx.user(7).await;
        let ghost = Application::new_pending(requester.id, "ghost", chrono::Utc::now()).unwrap();
        let err = fx
            .run(
                &DecisionHandler::new(DecisionAction::Approve),
                &tap(ADMIN, &ghost, DecisionAction::Approve),
                ConversationState::Idle,
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn pending_list_renders_one_card_per_application() {
        let fx = Fixture::new();
        for (id, nick) in [(7, "Alice"), (8, "Bob")] {
            let user = fx.user(id).await;
            fx.store.create_application(user.id, nick).await.unwrap();
        }
        let update = Update::message(1, profile(ADMIN), 1, "/admin");
        let reply = fx
            .run(&PendingListHandler, &update, ConversationState::Start)
            .await
            .unwrap();
        assert_eq!(reply.next_state, ConversationState::Idle);
        let effects = &reply.response.effects;
        assert_eq!(effects.len(), 3);
        assert!(matches!(
            &effects[1],
            Effect::Send(m) if m.text.contains("Bob") && matches!(m.keyboard, Some(Keyboard::Inline(_)))
        ));
    }

    #[tokio::test]
    async fn empty_pending_list() {
        let fx = Fixture::new();
        let update = Update::message(1, profile(ADMIN), 1, "/admin");
        let reply = fx
            .run(&PendingListHandler, &update, ConversationState::Idle)
            .await
            .unwrap();
        assert_eq!(reply.response.sent_texts(), vec![messages::NO_PENDING]);
    }

    #[tokio::test]
    async fn rejected_callbacks() {
        let fx = Fixture::new();
        let requester = fx.user(7).await;
        let app = fx.store.create_application(requester.id, "Alice").await.unwrap();

        let err = fx
            .run(
                &RejectCallbackHandler,
                &tap(7, &app, DecisionAction::Approve),
                ConversationState::Idle,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::Unauthorized(_)));

        let junk = Update::callback(1, profile(7), "cb", None, "junk");
        let err = fx
            .run(&RejectCallbackHandler, &junk, ConversationState::Idle)
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::Validation(_)));
        assert!(fx.store.application_by_id(app.id).await.unwrap().is_pending());
    }
}
