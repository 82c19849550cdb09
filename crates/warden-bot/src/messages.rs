// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-visible texts.
//!
//! Messages are sent with HTML parse mode, so anything user-supplied goes
//! through [`escape_html`] first.

use warden_core::{Application, ApplicationStatus, ConflictKind, User, WardenError};

pub const BUTTON_APPLY: &str = "Подать заявку";
pub const BUTTON_STATUS: &str = "Моя заявка";
pub const BUTTON_ADMIN: &str = "Админ";
pub const BUTTON_CANCEL: &str = "Отмена";
pub const BUTTON_APPROVE: &str = "Одобрить";
pub const BUTTON_DECLINE: &str = "Отклонить";

pub const WELCOME: &str = "Привет! Здесь можно подать заявку на добавление в белый список.";
pub const ASK_NICKNAME: &str = "Введите ваш игровой никнейм";
pub const APPLY_CANCELED: &str = "Подача заявки отменена";
pub const NO_APPLICATIONS: &str = "У вас пока нет заявок";
pub const NO_PENDING: &str = "Нет заявок на рассмотрении";
pub const ALREADY_PROCESSED: &str = "Заявка уже обработана";
pub const PENDING_EXISTS: &str = "Ваша заявка уже на рассмотрении, дождитесь решения";
pub const TOO_MANY_APPLICATIONS: &str = "Достигнут лимит заявок";
pub const APPROVED_ANSWER: &str = "Заявка одобрена";
pub const DECLINED_ANSWER: &str = "Заявка отклонена";

pub const UNKNOWN_COMMAND: &str = "Неизвестная команда";
pub const INVALID_STATE: &str = "Неверное состояние пользователя";
pub const UNAUTHORIZED: &str = "Недостаточно прав для выполнения действия";
pub const INTERNAL_ERROR: &str = "Произошла ошибка при обработке команды";

/// Escapes the characters Telegram's HTML mode treats specially.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// The message shown to the user for a failed update. `None` means silence.
pub fn error_text(err: &WardenError) -> Option<String> {
    let text = match err {
        WardenError::Canceled => return None,
        WardenError::UnknownCommand => UNKNOWN_COMMAND.to_string(),
        WardenError::InvalidState(_) => INVALID_STATE.to_string(),
        WardenError::Unauthorized(_) => UNAUTHORIZED.to_string(),
        WardenError::Validation(errors) => {
            format!("Некорректные данные: {}", escape_html(&errors.to_string()))
        }
        WardenError::Conflict(kind) => conflict_text(kind).to_string(),
        _ => INTERNAL_ERROR.to_string(),
    };
    Some(text)
}

pub fn conflict_text(kind: &ConflictKind) -> &'static str {
    match kind {
        ConflictKind::PendingExists => PENDING_EXISTS,
        ConflictKind::TooManyApplications { .. } => TOO_MANY_APPLICATIONS,
        ConflictKind::AlreadyDecided => ALREADY_PROCESSED,
        ConflictKind::DuplicateUser => INTERNAL_ERROR,
    }
}

pub fn status_label(status: ApplicationStatus) -> &'static str {
    match status {
        ApplicationStatus::Pending => "на рассмотрении",
        ApplicationStatus::Approved => "одобрена",
        ApplicationStatus::Declined => "отклонена",
    }
}

pub fn application_submitted(app: &Application) -> String {
    format!(
        "Заявка на никнейм <b>{}</b> отправлена на рассмотрение",
        escape_html(&app.nickname)
    )
}

pub fn application_status(app: &Application) -> String {
    let mut text = format!(
        "Ваша заявка на никнейм <b>{}</b>: {}",
        escape_html(&app.nickname),
        status_label(app.status)
    );
    if let Some(reason) = &app.decline_reason {
        text.push_str(&format!("\nПричина: {}", escape_html(reason)));
    }
    text
}

/// One line of the admin listing / fan-out.
pub fn application_card(app: &Application, requester: &User) -> String {
    format!(
        "Заявка <b>{}</b> от {}\nСоздана: {}",
        escape_html(&app.nickname),
        escape_html(&requester.display_name()),
        app.created_at.format("%Y-%m-%d %H:%M UTC")
    )
}

pub fn pending_header(count: usize) -> String {
    format!("Заявки на рассмотрении: {count}")
}

pub fn new_application_notice(app: &Application, requester: &User) -> String {
    format!("Новая заявка\n{}", application_card(app, requester))
}

/// Replacement text for the arbiter's message after a decision.
pub fn decided_card(app: &Application, requester: &User, arbiter: &User) -> String {
    format!(
        "{}\nСтатус: {} ({})",
        application_card(app, requester),
        status_label(app.status),
        escape_html(&arbiter.display_name())
    )
}

/// What the requester is told once an admin decided.
pub fn decision_notice(app: &Application) -> String {
    match app.status {
        ApplicationStatus::Approved => format!(
            "Ваша заявка на никнейм <b>{}</b> одобрена!",
            escape_html(&app.nickname)
        ),
        _ => format!(
            "Ваша заявка на никнейм <b>{}</b> отклонена.\nПричина: {}",
            escape_html(&app.nickname),
            escape_html(app.decline_reason.as_deref().unwrap_or_default())
        ),
    }
}
