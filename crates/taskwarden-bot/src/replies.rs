// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing reply texts.

use chrono::{DateTime, Utc};

use taskwarden_core::domain::format_deadline;
use taskwarden_core::{Role, Task, TaskId, TaskStatus};

pub const WELCOME: &str = "Добро пожаловать!";
pub const UNKNOWN_COMMAND: &str = "Неизвестная или недоступная команда, попробуйте другую";
pub const GENERIC_ERROR: &str = "Произошла непредвиденная ошибка, уже чиним 🤕";
pub const HEALTHY: &str = "Status Ok!";

pub const CONTACT_REQUEST: &str = "Пожалуйста поделитесь своим номером телефона. Это можно сделать с помощью соответствующего пункта в меню";
pub const SHARE_CONTACT_BUTTON: &str = "Поделиться номером телефона";
pub const THANKS: &str = "Спасибо!";

pub const ENTER_PASSWORD: &str = "Введите пароль для идентификации";
pub const WRONG_PASSWORD: &str = "Вы ввели неверный пароль. Попробуйте ещё";
pub const ROLE_CHANGED: &str = "Ваша роль успешно изменена";

pub const ENTER_TASK_NAME: &str = "Введите название задачи";
pub const ENTER_EXECUTOR: &str =
    "Введите ник исполнителя в формате @username или телефон в формате 79xxxxxxxxx";
pub const ENTER_DEADLINE: &str = "Введите дедлайн задачи в формате 21.12.2024 12:20:00";
pub const ENTER_TASK_ID: &str = "Введите номер задачи";
pub const ENTER_ID_AND_DEADLINE: &str =
    "Введите номер задачи и новый дедлайн в формате \"21 21.12.2024 12:20:00\"";

pub const BAD_TASK_ID: &str = "Некорректный номер задачи, должно быть число";
pub const BAD_DATETIME: &str = "Некорректный формат даты-времени, проверьте, что вы вводите дату и время в формате, похожем на 21.12.2024 12:20:00";
pub const DEADLINE_IN_PAST: &str = "Некорректное время дедлайна. Убедитесь, что вы ввели время момента в будущем в качестве дедлайна";
pub const BAD_ID_AND_DEADLINE: &str =
    "Некорректный формат, убедитесь что формат аналогичен \"21 21.12.2024 12:20:00\"";

pub const TASK_DELETED: &str = "Задача успешно удалена";
pub const DELETE_UNSUPPORTED: &str = "Удаление задач не поддерживается текущим хранилищем";

pub const NO_TASKS: &str = "Нет добавленных задач";
pub const NO_OPEN_TASKS: &str = "Нет открытых задач";
pub const NO_DONE_TASKS: &str = "Нет выполненных задач";
pub const NO_CLOSED_TASKS: &str = "Нет закрытых задач";
pub const NO_EXPIRED_TASKS: &str = "Нет просроченных задач";
pub const NO_SELF_TASKS: &str = "Нет назначенных вам задач";

pub fn your_role(role: Role) -> String {
    format!("Ваша роль - {role}")
}

pub fn task_added(task: &Task, now: DateTime<Utc>) -> String {
    format!("Вы успешно добавили задачу: \n\n{}", task.render(now))
}

pub fn status_changed(status: TaskStatus) -> String {
    format!("Статус задачи успешно изменен на \"{status}\"")
}

pub fn task_not_found(id: TaskId) -> String {
    format!("Задача с номером {id} не найдена")
}

pub fn deadline_changed(id: TaskId, deadline: DateTime<Utc>) -> String {
    format!(
        "Дедлайн задачи №{id} успешно изменен на {}",
        format_deadline(deadline)
    )
}

/// Update pushed to observers and executors.
pub fn notification(task: &Task, now: DateTime<Utc>) -> String {
    format!("UPD: \n\n{}", task.render(now))
}

/// Task cards separated by blank lines, or `empty` when there are none.
pub fn task_list(tasks: &[Task], now: DateTime<Utc>, empty: &str) -> String {
    if tasks.is_empty() {
        return empty.to_string();
    }
    tasks
        .iter()
        .map(|task| task.render(now))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn debug_dump(chat_id: i64, dump: &str) -> String {
    format!("Your chat id is {chat_id}\n{dump}")
}
