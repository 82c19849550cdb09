// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of transport-agnostic keyboards and parse modes to teloxide types.

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, KeyboardRemove,
    ParseMode as TgParseMode, ReplyMarkup,
};
use warden_core::response::{InlineButton, Keyboard, ParseMode};

/// `None` for plain text.
pub fn parse_mode(mode: ParseMode) -> Option<TgParseMode> {
    match mode {
        ParseMode::Html => Some(TgParseMode::Html),
        ParseMode::MarkdownV2 => Some(TgParseMode::MarkdownV2),
        ParseMode::Plain => None,
    }
}

fn inline_rows(rows: &[Vec<InlineButton>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.text.clone(), b.callback_data.clone()))
            .collect::<Vec<_>>()
    }))
}

pub fn reply_markup(keyboard: &Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::Reply(rows) => ReplyMarkup::Keyboard(
            KeyboardMarkup::new(rows.iter().map(|row| {
                row.iter()
                    .map(|label| KeyboardButton::new(label.clone()))
                    .collect::<Vec<_>>()
            }))
            .resize_keyboard(),
        ),
        Keyboard::Remove => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
        Keyboard::Inline(rows) => ReplyMarkup::InlineKeyboard(inline_rows(rows)),
    }
}

/// Only inline keyboards can be attached to an edited message.
pub fn inline_markup(keyboard: &Keyboard) -> Option<InlineKeyboardMarkup> {
    match keyboard {
        Keyboard::Inline(rows) => Some(inline_rows(rows)),
        Keyboard::Reply(_) | Keyboard::Remove => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_keyboard_keeps_layout() {
        let keyboard = Keyboard::Reply(vec![
            vec!["Подать заявку".into(), "Моя заявка".into()],
            vec!["Админ".into()],
        ]);
        match reply_markup(&keyboard) {
            ReplyMarkup::Keyboard(markup) => {
                assert_eq!(markup.keyboard.len(), 2);
                assert_eq!(markup.keyboard[0].len(), 2);
                assert_eq!(markup.keyboard[1][0].text, "Админ");
            }
            other => panic!("expected reply keyboard, got {other:?}"),
        }
    }

    #[test]
    fn remove_maps_to_keyboard_remove() {
        assert!(matches!(
            reply_markup(&Keyboard::Remove),
            ReplyMarkup::KeyboardRemove(_)
        ));
    }

    #[test]
    fn inline_buttons_carry_callback_data() {
        let keyboard = Keyboard::Inline(vec![vec![InlineButton::new("Одобрить", "data-1")]]);
        let markup = inline_markup(&keyboard).unwrap();
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(json["inline_keyboard"][0][0]["callback_data"], "data-1");
        assert!(inline_markup(&Keyboard::Remove).is_none());
    }

    #[test]
    fn plain_has_no_parse_mode() {
        assert_eq!(parse_mode(ParseMode::Plain), None);
        assert_eq!(parse_mode(ParseMode::Html), Some(TgParseMode::Html));
    }
}
