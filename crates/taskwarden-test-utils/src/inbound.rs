// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for inbound messages.

use std::sync::atomic::{AtomicI32, Ordering};

use chrono::Utc;

use taskwarden_core::types::{ChatId, Contact, InboundMessage, MessageContent, MessageId};

static NEXT_ID: AtomicI32 = AtomicI32::new(1000);

fn base(chat_id: i64, content: MessageContent) -> InboundMessage {
    InboundMessage {
        id: MessageId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
        chat_id: ChatId(chat_id),
        username: Some(format!("user{chat_id}")),
        content,
        contact: None,
        timestamp: Utc::now(),
    }
}

/// Free text, or a command when it starts with `/`.
pub fn text(chat_id: i64, body: &str) -> InboundMessage {
    base(chat_id, MessageContent::parse(body))
}

pub fn command(chat_id: i64, name: &str) -> InboundMessage {
    text(chat_id, &format!("/{name}"))
}

/// A shared contact card with no text.
pub fn contact(chat_id: i64, phone: &str) -> InboundMessage {
    InboundMessage {
        contact: Some(Contact {
            phone_number: phone.to_string(),
        }),
        ..base(chat_id, MessageContent::Text(String::new()))
    }
}

/// Overrides the sender username.
pub fn from_user(mut msg: InboundMessage, username: &str) -> InboundMessage {
    msg.username = Some(username.to_string());
    msg
}
