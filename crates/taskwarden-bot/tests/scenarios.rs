// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation scenarios driven through `TaskBot::handle`.
//!
//! Each test builds its own `TestBot` over fresh storage and a mock channel.

use chrono::Duration;

use taskwarden_bot::commands::menu_for;
use taskwarden_bot::replies;
use taskwarden_core::types::ReplyKeyboard;
use taskwarden_core::{ChatId, NewTask, Role, Stage, StorageAdapter, TaskId, TaskStatus};
use taskwarden_test_utils::{TestBot, inbound, password_for};

async fn stage_of(test: &TestBot, chat_id: i64) -> Option<Stage> {
    test.storage.get_stage(ChatId(chat_id)).await.unwrap()
}

async fn role_of(test: &TestBot, chat_id: i64) -> Option<Role> {
    test.storage.get_role(ChatId(chat_id)).await.unwrap()
}

/// Walks `chat_id` through the add-task dialog and returns the final reply.
async fn add_task(test: &TestBot, chat_id: i64, title: &str, executor: &str) -> Option<String> {
    test.say(chat_id, "/add_task").await;
    test.say(chat_id, title).await;
    test.say(chat_id, executor).await;
    test.say(chat_id, &test.deadline_in(Duration::days(1))).await
}

async fn seed_task(test: &TestBot, title: &str) -> TaskId {
    use taskwarden_core::Clock;
    test.storage
        .add_task(NewTask {
            title: title.into(),
            executor_contact: "alice".into(),
            executor_chat_id: None,
            deadline: test.clock.now() + Duration::hours(1),
        })
        .await
        .unwrap()
}

// ---- Add task ----

#[tokio::test]
async fn observer_adds_task_and_other_observers_are_notified() {
    let test = TestBot::new().await.unwrap();
    test.register(100, "boss", Role::Observer).await.unwrap();
    test.register(101, "watcher", Role::Observer).await.unwrap();

    assert_eq!(test.say(100, "/add_task").await.as_deref(), Some(replies::ENTER_TASK_NAME));
    assert_eq!(stage_of(&test, 100).await, Some(Stage::AddTaskName));
    assert_eq!(test.say(100, "Fix login bug").await.as_deref(), Some(replies::ENTER_EXECUTOR));
    assert_eq!(stage_of(&test, 100).await, Some(Stage::AddTaskUser));
    assert_eq!(test.say(100, "@alice").await.as_deref(), Some(replies::ENTER_DEADLINE));
    assert_eq!(stage_of(&test, 100).await, Some(Stage::AddTaskDeadline));

    let deadline = test.deadline_in(Duration::days(1));
    let reply = test.say(100, &deadline).await.unwrap();
    assert!(reply.starts_with("Вы успешно добавили задачу"), "got: {reply}");
    assert!(reply.contains("Задача №1"));
    assert_eq!(stage_of(&test, 100).await, Some(Stage::Default));

    let tasks = test.storage.get_all_tasks().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, TaskId(1));
    assert_eq!(tasks[0].title, "Fix login bug");
    assert_eq!(tasks[0].executor_contact, "alice");
    assert_eq!(tasks[0].status(), TaskStatus::Open);

    let update = test.channel.last_text(ChatId(101)).await.unwrap();
    assert!(update.starts_with("UPD:"));
    assert!(update.contains("Fix login bug"));
    assert!(update.contains(&deadline));

    let to_author = test.channel.sent_to(ChatId(100)).await;
    assert!(to_author.iter().all(|m| !m.text.starts_with("UPD:")));

    let draft = test.storage.get_task_in_progress(ChatId(100)).await.unwrap();
    assert_eq!(draft, Default::default());
}

#[tokio::test]
async fn known_executor_is_notified_about_new_task() {
    let test = TestBot::new().await.unwrap();
    test.register(200, "chief", Role::Chief).await.unwrap();
    test.register(300, "alice", Role::Executor).await.unwrap();

    add_task(&test, 200, "Write report", "@alice").await;

    let tasks = test.storage.get_all_tasks().await.unwrap();
    assert_eq!(tasks[0].executor_chat_id, Some(ChatId(300)));
    let update = test.channel.last_text(ChatId(300)).await.unwrap();
    assert!(update.starts_with("UPD:"));
    assert!(update.contains("Write report"));
}

#[tokio::test]
async fn observing_executor_gets_one_update() {
    let test = TestBot::new().await.unwrap();
    test.register(100, "boss", Role::Observer).await.unwrap();
    test.register(101, "watcher", Role::Observer).await.unwrap();

    add_task(&test, 100, "Audit logs", "@watcher").await;

    let tasks = test.storage.get_all_tasks().await.unwrap();
    assert_eq!(tasks[0].executor_chat_id, Some(ChatId(101)));
    let updates: Vec<String> = test
        .channel
        .sent_to(ChatId(101))
        .await
        .into_iter()
        .map(|m| m.text)
        .filter(|text| text.starts_with("UPD:"))
        .collect();
    assert_eq!(updates.len(), 1, "{updates:?}");
    assert!(updates[0].contains("Audit logs"));
}

#[tokio::test]
async fn add_task_restarts_with_empty_draft() {
    let test = TestBot::new().await.unwrap();
    test.register(200, "chief", Role::Chief).await.unwrap();

    test.say(200, "/add_task").await;
    test.say(200, "Abandoned").await;
    test.say(200, "/add_task").await;

    let draft = test.storage.get_task_in_progress(ChatId(200)).await.unwrap();
    assert!(draft.title.is_none());
    assert_eq!(stage_of(&test, 200).await, Some(Stage::AddTaskName));
}

#[tokio::test]
async fn deadline_must_be_strictly_in_the_future() {
    let test = TestBot::new().await.unwrap();
    test.register(200, "chief", Role::Chief).await.unwrap();
    test.say(200, "/add_task").await;
    test.say(200, "Boundary").await;
    test.say(200, "@alice").await;

    let now = test.deadline_in(Duration::zero());
    assert_eq!(test.say(200, &now).await.as_deref(), Some(replies::DEADLINE_IN_PAST));
    assert_eq!(stage_of(&test, 200).await, Some(Stage::AddTaskDeadline));

    assert_eq!(
        test.say(200, "tomorrow at noon").await.as_deref(),
        Some(replies::BAD_DATETIME)
    );
    assert_eq!(stage_of(&test, 200).await, Some(Stage::AddTaskDeadline));

    let next_second = test.deadline_in(Duration::seconds(1));
    let reply = test.say(200, &next_second).await.unwrap();
    assert!(reply.starts_with("Вы успешно добавили задачу"), "got: {reply}");
    assert_eq!(test.storage.get_all_tasks().await.unwrap().len(), 1);
}

// ---- Task updates ----

#[tokio::test]
async fn chief_marks_missing_task_as_done() {
    let test = TestBot::new().await.unwrap();
    test.register(200, "chief", Role::Chief).await.unwrap();

    assert_eq!(test.say(200, "/do_task").await.as_deref(), Some(replies::ENTER_TASK_ID));
    assert_eq!(stage_of(&test, 200).await, Some(Stage::MarkTaskAsDone));
    assert_eq!(
        test.say(200, "7").await.as_deref(),
        Some("Задача с номером 7 не найдена")
    );
    assert_eq!(stage_of(&test, 200).await, Some(Stage::Default));
    assert!(test.storage.get_all_tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn non_numeric_task_id_reprompts() {
    let test = TestBot::new().await.unwrap();
    test.register(200, "chief", Role::Chief).await.unwrap();

    test.say(200, "/do_task").await;
    assert_eq!(test.say(200, "seven").await.as_deref(), Some(replies::BAD_TASK_ID));
    assert_eq!(stage_of(&test, 200).await, Some(Stage::MarkTaskAsDone));
}

#[tokio::test]
async fn close_task_updates_status_and_notifies_observers() {
    let test = TestBot::new().await.unwrap();
    test.register(100, "boss", Role::Observer).await.unwrap();
    test.register(101, "watcher", Role::Observer).await.unwrap();
    let id = seed_task(&test, "Ship release").await;

    test.say(100, "/close_task").await;
    assert_eq!(
        test.say(100, &id.to_string()).await.as_deref(),
        Some("Статус задачи успешно изменен на \"закрыта\"")
    );

    let closed = test.storage.get_closed_tasks().await.unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].id, id);

    let update = test.channel.last_text(ChatId(101)).await.unwrap();
    assert!(update.contains("закрыта"));
}

#[tokio::test]
async fn change_deadline_clears_expired_flag() {
    use taskwarden_core::Clock;

    let test = TestBot::new().await.unwrap();
    test.register(200, "chief", Role::Chief).await.unwrap();
    let id = seed_task(&test, "Late one").await;

    test.clock.advance(Duration::hours(2));
    let marked = test
        .storage
        .get_expired_tasks_to_mark(test.clock.now())
        .await
        .unwrap();
    assert_eq!(marked.len(), 1);

    test.say(200, "/change_deadline").await;
    assert_eq!(
        test.say(200, "1 soon").await.as_deref(),
        Some(replies::BAD_DATETIME)
    );
    assert_eq!(
        test.say(200, "one").await.as_deref(),
        Some(replies::BAD_ID_AND_DEADLINE)
    );
    let deadline = test.deadline_in(Duration::days(3));
    let reply = test.say(200, &format!("{id} {deadline}")).await.unwrap();
    assert_eq!(reply, format!("Дедлайн задачи №1 успешно изменен на {deadline}"));

    let tasks = test.storage.get_all_tasks().await.unwrap();
    assert_eq!(tasks[0].status(), TaskStatus::Open);
    assert!(test.storage.get_expired_tasks().await.unwrap().is_empty());
    assert_eq!(stage_of(&test, 200).await, Some(Stage::Default));
}

#[tokio::test]
async fn change_deadline_of_missing_task_returns_to_default() {
    let test = TestBot::new().await.unwrap();
    test.register(200, "chief", Role::Chief).await.unwrap();

    test.say(200, "/change_deadline").await;
    assert_eq!(stage_of(&test, 200).await, Some(Stage::ChangeDeadline));
    let deadline = test.deadline_in(Duration::days(1));
    assert_eq!(
        test.say(200, &format!("99 {deadline}")).await.as_deref(),
        Some("Задача с номером 99 не найдена")
    );
    assert_eq!(stage_of(&test, 200).await, Some(Stage::Default));
    assert!(test.storage.get_all_tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn change_deadline_rejects_past_date_and_keeps_stage() {
    let test = TestBot::new().await.unwrap();
    test.register(200, "chief", Role::Chief).await.unwrap();
    let id = seed_task(&test, "Keep me").await;
    let original = test.storage.get_all_tasks().await.unwrap()[0].deadline;

    test.say(200, "/change_deadline").await;
    let past = test.deadline_in(Duration::hours(-1));
    assert_eq!(
        test.say(200, &format!("{id} {past}")).await.as_deref(),
        Some(replies::DEADLINE_IN_PAST)
    );
    assert_eq!(stage_of(&test, 200).await, Some(Stage::ChangeDeadline));
    assert_eq!(test.storage.get_all_tasks().await.unwrap()[0].deadline, original);

    let now = test.deadline_in(Duration::zero());
    assert_eq!(
        test.say(200, &format!("{id} {now}")).await.as_deref(),
        Some(replies::DEADLINE_IN_PAST)
    );
    assert_eq!(stage_of(&test, 200).await, Some(Stage::ChangeDeadline));
}

#[tokio::test]
async fn delete_is_reported_unsupported_on_memory_backend() {
    let test = TestBot::new().await.unwrap();
    test.register(1, "admin", Role::Admin).await.unwrap();
    seed_task(&test, "Keep me").await;

    test.say(1, "/delete_task").await;
    assert_eq!(test.say(1, "1").await.as_deref(), Some(replies::DELETE_UNSUPPORTED));
    assert_eq!(stage_of(&test, 1).await, Some(Stage::Default));
    assert_eq!(test.storage.get_all_tasks().await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_removes_task_on_sqlite_backend() {
    let test = TestBot::builder().with_sqlite().build().await.unwrap();
    test.register(1, "admin", Role::Admin).await.unwrap();
    seed_task(&test, "Drop me").await;

    test.say(1, "/delete_task").await;
    assert_eq!(test.say(1, "1").await.as_deref(), Some(replies::TASK_DELETED));
    assert!(test.storage.get_all_tasks().await.unwrap().is_empty());

    test.say(1, "/delete_task").await;
    assert_eq!(
        test.say(1, "1").await.as_deref(),
        Some("Задача с номером 1 не найдена")
    );
}

// ---- Access control ----

#[tokio::test]
async fn forbidden_command_changes_nothing() {
    let test = TestBot::new().await.unwrap();
    test.register(300, "alice", Role::Executor).await.unwrap();

    assert_eq!(
        test.say(300, "/add_task").await.as_deref(),
        Some(replies::UNKNOWN_COMMAND)
    );
    assert_eq!(stage_of(&test, 300).await, Some(Stage::Default));
    assert_eq!(role_of(&test, 300).await, Some(Role::Executor));
    assert_eq!(
        test.storage.get_task_in_progress(ChatId(300)).await.unwrap(),
        Default::default()
    );

    assert_eq!(
        test.say(300, "/frobnicate").await.as_deref(),
        Some(replies::UNKNOWN_COMMAND)
    );
}

#[tokio::test]
async fn first_command_registers_unknown_chat() {
    let test = TestBot::new().await.unwrap();

    assert_eq!(
        test.say(42, "/get_all_tasks").await.as_deref(),
        Some(replies::UNKNOWN_COMMAND)
    );
    let chat = test.storage.get_chat_by_id(ChatId(42)).await.unwrap().unwrap();
    assert_eq!(chat.role, Role::Unknown);
    assert_eq!(chat.stage, Stage::Unknown);
    assert_eq!(chat.username, "user42");

    assert_eq!(test.say(42, "/get_role").await.as_deref(), Some("Ваша роль - unknown"));
}

#[tokio::test]
async fn start_publishes_role_menu() {
    let test = TestBot::new().await.unwrap();
    test.register(200, "chief", Role::Chief).await.unwrap();

    assert_eq!(test.say(200, "/start").await.as_deref(), Some(replies::WELCOME));
    assert_eq!(test.channel.menu(ChatId(200)).await, Some(menu_for(Role::Chief)));
}

// ---- Passwords ----

#[tokio::test]
async fn wrong_then_right_password() {
    let test = TestBot::new().await.unwrap();

    assert_eq!(
        test.say(400, "/become_chief").await.as_deref(),
        Some(replies::ENTER_PASSWORD)
    );
    assert_eq!(stage_of(&test, 400).await, Some(Stage::BecomeChief));

    let wrong = inbound::text(400, "guess");
    let wrong_id = wrong.id;
    test.handle(wrong).await;
    assert_eq!(
        test.channel.last_text(ChatId(400)).await.as_deref(),
        Some(replies::WRONG_PASSWORD)
    );
    assert_eq!(role_of(&test, 400).await, Some(Role::Unknown));
    assert_eq!(stage_of(&test, 400).await, Some(Stage::BecomeChief));
    assert!(test.channel.menu(ChatId(400)).await.is_none());

    let right = inbound::text(400, &password_for(Role::Chief));
    let right_id = right.id;
    test.handle(right).await;
    assert_eq!(
        test.channel.last_text(ChatId(400)).await.as_deref(),
        Some(replies::ROLE_CHANGED)
    );
    assert_eq!(role_of(&test, 400).await, Some(Role::Chief));
    assert_eq!(stage_of(&test, 400).await, Some(Stage::Default));
    assert_eq!(test.channel.menu(ChatId(400)).await, Some(menu_for(Role::Chief)));

    let deleted = test.channel.deleted_messages().await;
    assert_eq!(deleted, vec![(ChatId(400), wrong_id), (ChatId(400), right_id)]);
}

#[tokio::test]
async fn role_without_password_cannot_be_acquired() {
    let test = TestBot::builder().without_passwords().build().await.unwrap();

    test.say(5, "/become_admin").await;
    assert_eq!(test.say(5, "").await.as_deref(), Some(replies::WRONG_PASSWORD));
    assert_eq!(role_of(&test, 5).await, Some(Role::Unknown));
}

// ---- Introduction ----

#[tokio::test]
async fn contact_flow_registers_phone_and_finds_self_tasks() {
    let test = TestBot::new().await.unwrap();

    assert_eq!(test.say(500, "hello").await.as_deref(), Some(replies::CONTACT_REQUEST));
    let request = test.channel.sent_to(ChatId(500)).await.pop().unwrap();
    assert!(matches!(request.keyboard, Some(ReplyKeyboard::RequestContact { .. })));
    assert_eq!(stage_of(&test, 500).await, Some(Stage::ContactRequest));

    assert_eq!(
        test.say(500, "no phone for you").await.as_deref(),
        Some(replies::CONTACT_REQUEST)
    );

    test.handle(inbound::contact(500, "+79001234567")).await;
    let thanks = test.channel.sent_to(ChatId(500)).await.pop().unwrap();
    assert_eq!(thanks.text, replies::THANKS);
    assert_eq!(thanks.keyboard, Some(ReplyKeyboard::Remove));
    let chat = test.storage.get_chat_by_id(ChatId(500)).await.unwrap().unwrap();
    assert_eq!(chat.phone.as_deref(), Some("79001234567"));
    assert_eq!(chat.stage, Stage::Default);

    test.say(500, "/become_executor").await;
    test.say(500, &password_for(Role::Executor)).await;

    test.register(200, "chief", Role::Chief).await.unwrap();
    add_task(&test, 200, "Call the client", "+79001234567").await;
    add_task(&test, 200, "Someone else's", "@bob").await;

    let tasks = test.storage.get_all_tasks().await.unwrap();
    assert_eq!(tasks[0].executor_chat_id, Some(ChatId(500)));

    let mine = test.say(500, "/get_self_tasks").await.unwrap();
    assert!(mine.contains("Call the client"));
    assert!(!mine.contains("Someone else's"));
}

#[tokio::test]
async fn default_stage_text_gets_welcome() {
    let test = TestBot::new().await.unwrap();
    test.register(200, "chief", Role::Chief).await.unwrap();

    assert_eq!(test.say(200, "anyone there?").await.as_deref(), Some(replies::WELCOME));
}

// ---- Lists and admin commands ----

#[tokio::test]
async fn lists_show_matching_tasks_or_empty_text() {
    let test = TestBot::new().await.unwrap();
    test.register(200, "chief", Role::Chief).await.unwrap();

    assert_eq!(test.say(200, "/get_all_tasks").await.as_deref(), Some(replies::NO_TASKS));
    assert_eq!(
        test.say(200, "/get_done_tasks").await.as_deref(),
        Some(replies::NO_DONE_TASKS)
    );

    seed_task(&test, "First").await;
    seed_task(&test, "Second").await;
    test.storage.mark_task_as_done(TaskId(2)).await.unwrap();

    let all = test.say(200, "/get_all_tasks").await.unwrap();
    assert_eq!(all.split("\n\n").count(), 2);
    let open = test.say(200, "/get_open_tasks").await.unwrap();
    assert!(open.contains("First") && !open.contains("Second"));
    let done = test.say(200, "/get_done_tasks").await.unwrap();
    assert!(done.contains("Second") && done.contains("выполнена"));
}

#[tokio::test]
async fn admin_health_and_debug() {
    let test = TestBot::new().await.unwrap();
    test.register(1, "admin", Role::Admin).await.unwrap();

    assert_eq!(test.say(1, "/healthz").await.as_deref(), Some(replies::HEALTHY));

    let dump = test.say(1, "/debug").await.unwrap();
    assert!(dump.starts_with("Your chat id is 1\nbackend: memory"), "got: {dump}");
    assert!(dump.contains("@admin"));
}

#[tokio::test]
async fn bootstrap_admin_promotes_chat() {
    let test = TestBot::new().await.unwrap();
    test.register(9, "boss", Role::Executor).await.unwrap();

    test.bot.bootstrap_admin(ChatId(9), "").await.unwrap();

    let chat = test.storage.get_chat_by_id(ChatId(9)).await.unwrap().unwrap();
    assert_eq!(chat.role, Role::Admin);
    assert_eq!(chat.stage, Stage::Default);
    assert_eq!(chat.username, "boss");
    assert_eq!(test.channel.menu(ChatId(9)).await, Some(menu_for(Role::Admin)));
}

#[tokio::test]
async fn sqlite_backend_runs_add_task_dialog() {
    let test = TestBot::builder().with_sqlite().build().await.unwrap();
    test.register(100, "boss", Role::Observer).await.unwrap();
    test.register(101, "watcher", Role::Observer).await.unwrap();

    let reply = add_task(&test, 100, "Persisted", "@alice").await.unwrap();
    assert!(reply.contains("Задача №1"));
    assert!(test.channel.last_text(ChatId(101)).await.unwrap().contains("Persisted"));
}
