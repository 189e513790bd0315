// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion between teloxide types and the channel-agnostic core types.
//!
//! Inbound: a Telegram [`Message`] becomes an [`InboundMessage`] when it
//! carries text or a shared contact. Outbound: reply keyboards and command
//! menus are translated into their Bot API shapes.

use teloxide::types::{
    ButtonRequest, KeyboardButton, KeyboardMarkup, KeyboardRemove, Message, ReplyMarkup,
};
use tracing::debug;

use taskwarden_core::types::{
    BotCommand, ChatId, Contact, InboundMessage, MessageContent, MessageId, ReplyKeyboard,
};

/// Converts a Telegram message into an [`InboundMessage`].
///
/// Returns `None` for messages with neither text nor a contact (stickers,
/// photos, service messages).
pub fn to_inbound_message(msg: &Message) -> Option<InboundMessage> {
    let contact = msg.contact().map(|c| Contact {
        phone_number: c.phone_number.clone(),
    });

    let content = match (msg.text(), &contact) {
        (Some(text), _) => MessageContent::parse(text),
        (None, Some(_)) => MessageContent::Text(String::new()),
        (None, None) => {
            debug!(msg_id = msg.id.0, "ignoring message without text or contact");
            return None;
        }
    };

    Some(InboundMessage {
        id: MessageId(msg.id.0),
        chat_id: ChatId(msg.chat.id.0),
        username: sender_username(msg),
        content,
        contact,
        timestamp: msg.date,
    })
}

/// Username of the chat, falling back to the sender's username.
fn sender_username(msg: &Message) -> Option<String> {
    msg.chat
        .username()
        .map(str::to_string)
        .or_else(|| msg.from.as_ref().and_then(|u| u.username.clone()))
}

/// Builds the Bot API reply markup for a keyboard request.
pub fn to_reply_markup(keyboard: &ReplyKeyboard) -> ReplyMarkup {
    match keyboard {
        ReplyKeyboard::RequestContact { label } => {
            let button = KeyboardButton::new(label.clone()).request(ButtonRequest::Contact);
            ReplyMarkup::Keyboard(KeyboardMarkup::new(vec![vec![button]]))
        }
        ReplyKeyboard::Remove => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    }
}

pub fn to_telegram_commands(commands: Vec<BotCommand>) -> Vec<teloxide::types::BotCommand> {
    commands
        .into_iter()
        .map(|c| teloxide::types::BotCommand::new(c.command, c.description))
        .collect()
}

pub fn from_telegram_commands(commands: Vec<teloxide::types::BotCommand>) -> Vec<BotCommand> {
    commands
        .into_iter()
        .map(|c| BotCommand::new(c.command, c.description))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn private_chat(chat_id: i64, username: Option<&str>) -> serde_json::Value {
        match username {
            Some(name) => serde_json::json!({
                "id": chat_id,
                "type": "private",
                "first_name": "Test",
                "username": name,
            }),
            None => serde_json::json!({
                "id": chat_id,
                "type": "private",
                "first_name": "Test",
            }),
        }
    }

    /// Build a mock private chat message from JSON, matching Telegram Bot API structure.
    fn make_text_message(chat_id: i64, username: Option<&str>, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 42,
            "date": 1700000000i64,
            "chat": private_chat(chat_id, username),
            "from": {
                "id": chat_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "text": text,
        });

        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn make_contact_message(chat_id: i64, phone: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 43,
            "date": 1700000000i64,
            "chat": private_chat(chat_id, Some("alice")),
            "from": {
                "id": chat_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "contact": {
                "phone_number": phone,
                "first_name": "Test",
                "user_id": chat_id,
            },
        });

        serde_json::from_value(json).expect("failed to deserialize mock contact message")
    }

    fn make_location_message(chat_id: i64) -> Message {
        let json = serde_json::json!({
            "message_id": 44,
            "date": 1700000000i64,
            "chat": private_chat(chat_id, None),
            "from": {
                "id": chat_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "location": {
                "longitude": 37.6,
                "latitude": 55.7,
            },
        });

        serde_json::from_value(json).expect("failed to deserialize mock location message")
    }

    #[test]
    fn text_message_maps_fields() {
        let msg = make_text_message(100, Some("alice"), "Fix login bug");
        let inbound = to_inbound_message(&msg).unwrap();
        assert_eq!(inbound.id, MessageId(42));
        assert_eq!(inbound.chat_id, ChatId(100));
        assert_eq!(inbound.username.as_deref(), Some("alice"));
        assert_eq!(inbound.content, MessageContent::Text("Fix login bug".into()));
        assert!(inbound.contact.is_none());
        assert_eq!(inbound.timestamp.timestamp(), 1700000000);
    }

    #[test]
    fn command_with_bot_suffix_is_parsed() {
        let msg = make_text_message(100, Some("alice"), "/do_task@taskwarden_bot 7");
        let inbound = to_inbound_message(&msg).unwrap();
        assert_eq!(
            inbound.content,
            MessageContent::Command {
                name: "do_task".into(),
                args: "7".into(),
            }
        );
    }

    #[test]
    fn contact_message_carries_phone() {
        let msg = make_contact_message(100, "79001234567");
        let inbound = to_inbound_message(&msg).unwrap();
        assert_eq!(inbound.content, MessageContent::Text(String::new()));
        assert_eq!(inbound.contact.unwrap().phone_number, "79001234567");
    }

    #[test]
    fn message_without_username_has_none() {
        let msg = make_text_message(100, None, "hi");
        assert!(to_inbound_message(&msg).unwrap().username.is_none());
    }

    #[test]
    fn unsupported_message_is_skipped() {
        let msg = make_location_message(100);
        assert!(to_inbound_message(&msg).is_none());
    }

    #[test]
    fn contact_keyboard_requests_contact() {
        let markup = to_reply_markup(&ReplyKeyboard::RequestContact {
            label: "Поделиться номером телефона".into(),
        });
        let ReplyMarkup::Keyboard(keyboard) = markup else {
            panic!("expected a reply keyboard");
        };
        assert_eq!(keyboard.keyboard.len(), 1);
        assert_eq!(keyboard.keyboard[0][0].text, "Поделиться номером телефона");
        assert!(matches!(
            keyboard.keyboard[0][0].request,
            Some(ButtonRequest::Contact)
        ));
    }

    #[test]
    fn remove_keyboard_maps_to_keyboard_remove() {
        assert!(matches!(
            to_reply_markup(&ReplyKeyboard::Remove),
            ReplyMarkup::KeyboardRemove(_)
        ));
    }

    #[test]
    fn commands_convert_both_ways() {
        let ours = vec![BotCommand::new("start", "Начать")];
        let theirs = to_telegram_commands(ours.clone());
        assert_eq!(theirs[0].command, "start");
        assert_eq!(from_telegram_commands(theirs), ours);
    }
}
