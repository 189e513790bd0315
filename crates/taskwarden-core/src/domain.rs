// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model: chats, roles, conversation stages, and tasks.
//!
//! Task status is never stored. It is derived from the `done`, `closed` and
//! `expired` flags in [`Task::status`] and [`Task::status_at`], which are the
//! only places that encode the priority order.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::TaskwardenError;
use crate::types::{ChatId, TaskId};

/// Input and display format for deadlines, interpreted in the local time zone.
pub const DEADLINE_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Access tier granted to a chat.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Unknown,
    Executor,
    Observer,
    Chief,
    Admin,
}

impl Role {
    /// Roles that can be requested through a password prompt.
    pub const ASSIGNABLE: [Role; 4] = [Role::Executor, Role::Observer, Role::Chief, Role::Admin];

    /// The stage that waits for this role's password.
    pub fn password_stage(self) -> Option<Stage> {
        match self {
            Role::Executor => Some(Stage::BecomeExecutor),
            Role::Observer => Some(Stage::BecomeObserver),
            Role::Chief => Some(Stage::BecomeChief),
            Role::Admin => Some(Stage::BecomeAdmin),
            Role::Unknown => None,
        }
    }
}

/// Step of the conversation a chat is currently in.
///
/// Decides how the next free-text message from the chat is interpreted.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Chat registered without a completed introduction.
    #[default]
    Unknown,
    Default,
    BecomeExecutor,
    BecomeObserver,
    BecomeChief,
    BecomeAdmin,
    AddTaskName,
    AddTaskUser,
    AddTaskDeadline,
    MarkTaskAsDone,
    MarkTaskAsClosed,
    DeleteTask,
    ChangeDeadline,
    ContactRequest,
}

impl Stage {
    /// The role whose password this stage is waiting for.
    pub fn target_role(self) -> Option<Role> {
        match self {
            Stage::BecomeExecutor => Some(Role::Executor),
            Stage::BecomeObserver => Some(Role::Observer),
            Stage::BecomeChief => Some(Role::Chief),
            Stage::BecomeAdmin => Some(Role::Admin),
            _ => None,
        }
    }
}

/// One conversation with the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub chat_id: ChatId,
    pub username: String,
    pub phone: Option<String>,
    pub role: Role,
    pub stage: Stage,
}

/// Derived task status, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum TaskStatus {
    #[strum(serialize = "закрыта")]
    Closed,
    #[strum(serialize = "выполнена")]
    Done,
    #[strum(serialize = "просрочена")]
    Expired,
    #[strum(serialize = "открыта")]
    Open,
}

/// A tracked task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    /// Username without `@`, or phone digits.
    pub executor_contact: String,
    pub executor_chat_id: Option<ChatId>,
    pub deadline: DateTime<Utc>,
    pub done: bool,
    pub expired: bool,
    pub closed: bool,
}

impl Task {
    /// Status from the stored flags alone: closed > done > expired > open.
    pub fn status(&self) -> TaskStatus {
        if self.closed {
            TaskStatus::Closed
        } else if self.done {
            TaskStatus::Done
        } else if self.expired {
            TaskStatus::Expired
        } else {
            TaskStatus::Open
        }
    }

    /// Status for display: an open task past its deadline reads as expired
    /// even before the expiry scan has flagged it.
    pub fn status_at(&self, now: DateTime<Utc>) -> TaskStatus {
        match self.status() {
            TaskStatus::Open if now > self.deadline => TaskStatus::Expired,
            status => status,
        }
    }

    /// Whether the expiry scan should flag this task at `now`.
    pub fn is_due_for_expiry(&self, now: DateTime<Utc>) -> bool {
        !self.done && !self.closed && !self.expired && now >= self.deadline
    }

    /// HTML card shown in replies and notifications.
    pub fn render(&self, now: DateTime<Utc>) -> String {
        format!(
            "<b>Задача №{}</b>\n<b>Название:</b> {}\n<b>Дедлайн:</b> {}\n<b>Статус:</b> {}\n<b>Исполнитель:</b> {}",
            self.id,
            escape_html(&self.title),
            format_deadline(self.deadline),
            self.status_at(now),
            escape_html(&display_contact(&self.executor_contact)),
        )
    }
}

/// Fields needed to create a task. The id is assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub executor_contact: String,
    pub executor_chat_id: Option<ChatId>,
    pub deadline: DateTime<Utc>,
}

impl NewTask {
    /// The stored task this becomes once storage assigns `id`.
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            executor_contact: self.executor_contact,
            executor_chat_id: self.executor_chat_id,
            deadline: self.deadline,
            done: false,
            expired: false,
            closed: false,
        }
    }
}

/// Partially entered task, one per chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: Option<String>,
    pub executor_contact: Option<String>,
    pub executor_chat_id: Option<ChatId>,
    pub deadline: Option<DateTime<Utc>>,
}

impl TaskDraft {
    /// Converts a fully answered draft into a task to insert.
    pub fn complete(self) -> Result<NewTask, TaskwardenError> {
        let missing = |field: &str| TaskwardenError::InvalidInput(format!("draft has no {field}"));
        Ok(NewTask {
            title: self.title.ok_or_else(|| missing("title"))?,
            executor_contact: self.executor_contact.ok_or_else(|| missing("executor"))?,
            executor_chat_id: self.executor_chat_id,
            deadline: self.deadline.ok_or_else(|| missing("deadline"))?,
        })
    }
}

/// Inbound message kept in the mailbox until the reconciler marks it handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    pub id: i64,
    pub chat_id: ChatId,
    pub text: String,
    pub handled: bool,
}

/// Parses `DD.MM.YYYY hh:mm:ss` in the local time zone.
///
/// Local times that do not map to exactly one instant (DST transitions) are
/// rejected like any other malformed input.
pub fn parse_deadline(text: &str) -> Result<DateTime<Utc>, TaskwardenError> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), DEADLINE_FORMAT)
        .map_err(|e| TaskwardenError::InvalidInput(format!("bad deadline `{text}`: {e}")))?;
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| TaskwardenError::InvalidInput(format!("ambiguous local time `{text}`")))
}

/// Formats a deadline as `DD.MM.YYYY hh:mm:ss` in the local time zone.
pub fn format_deadline(deadline: DateTime<Utc>) -> String {
    deadline
        .with_timezone(&Local)
        .format(DEADLINE_FORMAT)
        .to_string()
}

/// Canonical stored form of an executor contact: no `@`, no leading `+`.
pub fn normalize_contact(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches('@');
    match trimmed.strip_prefix('+') {
        Some(digits) if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) => {
            digits.to_string()
        }
        _ => trimmed.to_string(),
    }
}

/// Phone numbers are shown as-is, usernames with a leading `@`.
pub fn display_contact(contact: &str) -> String {
    if !contact.is_empty() && contact.chars().all(|c| c.is_ascii_digit()) {
        contact.to_string()
    } else {
        format!("@{contact}")
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
