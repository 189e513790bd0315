// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command surface and the role access table.

use strum::{AsRefStr, Display, EnumIter, EnumString};

use taskwarden_core::Role;
use taskwarden_core::types::BotCommand;

/// Every slash command the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    Start,
    GetRole,
    BecomeExecutor,
    BecomeObserver,
    BecomeChief,
    BecomeAdmin,
    AddTask,
    GetAllTasks,
    GetOpenTasks,
    GetDoneTasks,
    GetClosedTasks,
    GetExpiredTasks,
    GetSelfTasks,
    DoTask,
    CloseTask,
    DeleteTask,
    ChangeDeadline,
    Healthz,
    Debug,
}

impl Command {
    /// Menu description shown by the platform.
    pub fn description(self) -> &'static str {
        match self {
            Command::Start => "Начать",
            Command::GetRole => "Получить свою роль",
            Command::BecomeExecutor => "Стать исполнителем",
            Command::BecomeObserver => "Стать наблюдателем",
            Command::BecomeChief => "Стать шефом",
            Command::BecomeAdmin => "Стать администратором",
            Command::AddTask => "Добавить задачу",
            Command::GetAllTasks => "Получить все задачи",
            Command::GetOpenTasks => "Получить открытые задачи",
            Command::GetDoneTasks => "Получить выполненные задачи",
            Command::GetClosedTasks => "Получить закрытые задачи",
            Command::GetExpiredTasks => "Получить просроченные задачи",
            Command::GetSelfTasks => "Получить свои задачи",
            Command::DoTask => "Отметить задачу выполненной",
            Command::CloseTask => "Закрыть задачу",
            Command::DeleteTask => "Удалить задачу",
            Command::ChangeDeadline => "Изменить дедлайн задачи",
            Command::Healthz => "Проверить состояние бота",
            Command::Debug => "Отладочная информация",
        }
    }

    /// The role a `become_*` command asks for.
    pub fn requested_role(self) -> Option<Role> {
        match self {
            Command::BecomeExecutor => Some(Role::Executor),
            Command::BecomeObserver => Some(Role::Observer),
            Command::BecomeChief => Some(Role::Chief),
            Command::BecomeAdmin => Some(Role::Admin),
            _ => None,
        }
    }
}

const UNKNOWN: &[Command] = &[
    Command::Start,
    Command::GetRole,
    Command::BecomeExecutor,
    Command::BecomeObserver,
    Command::BecomeChief,
    Command::BecomeAdmin,
];

const EXECUTOR: &[Command] = &[
    Command::Start,
    Command::GetRole,
    Command::BecomeObserver,
    Command::BecomeChief,
    Command::BecomeAdmin,
    Command::GetSelfTasks,
    Command::DoTask,
];

const CHIEF: &[Command] = &[
    Command::Start,
    Command::GetRole,
    Command::BecomeExecutor,
    Command::BecomeObserver,
    Command::BecomeAdmin,
    Command::AddTask,
    Command::GetAllTasks,
    Command::GetOpenTasks,
    Command::GetDoneTasks,
    Command::GetClosedTasks,
    Command::GetExpiredTasks,
    Command::DoTask,
    Command::ChangeDeadline,
];

const OBSERVER: &[Command] = &[
    Command::Start,
    Command::GetRole,
    Command::BecomeExecutor,
    Command::BecomeChief,
    Command::BecomeAdmin,
    Command::AddTask,
    Command::GetAllTasks,
    Command::GetOpenTasks,
    Command::GetDoneTasks,
    Command::GetClosedTasks,
    Command::GetExpiredTasks,
    Command::DoTask,
    Command::ChangeDeadline,
    Command::CloseTask,
    Command::DeleteTask,
];

const ADMIN: &[Command] = &[
    Command::Start,
    Command::GetRole,
    Command::BecomeExecutor,
    Command::BecomeObserver,
    Command::BecomeChief,
    Command::AddTask,
    Command::GetAllTasks,
    Command::GetOpenTasks,
    Command::GetDoneTasks,
    Command::GetClosedTasks,
    Command::GetExpiredTasks,
    Command::DoTask,
    Command::ChangeDeadline,
    Command::CloseTask,
    Command::DeleteTask,
    Command::Healthz,
    Command::Debug,
];

/// Commands a role may run, in menu order.
pub fn allowed_commands(role: Role) -> &'static [Command] {
    match role {
        Role::Unknown => UNKNOWN,
        Role::Executor => EXECUTOR,
        Role::Chief => CHIEF,
        Role::Observer => OBSERVER,
        Role::Admin => ADMIN,
    }
}

pub fn is_allowed(role: Role, command: Command) -> bool {
    allowed_commands(role).contains(&command)
}

/// The command menu published for a role.
pub fn menu_for(role: Role) -> Vec<BotCommand> {
    allowed_commands(role)
        .iter()
        .map(|c| BotCommand::new(c.as_ref(), c.description()))
        .collect()
}
