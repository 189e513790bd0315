// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./taskwarden.toml` > `~/.config/taskwarden/taskwarden.toml`
//! > `/etc/taskwarden/taskwarden.toml` with environment variable overrides via
//! the `TASKWARDEN_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TaskwardenConfig;

/// Config sections that environment variables may address.
const SECTIONS: [&str; 6] = [
    "bot",
    "telegram",
    "storage",
    "auth",
    "dispatcher",
    "reconciler",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/taskwarden/taskwarden.toml` (system-wide)
/// 3. `~/.config/taskwarden/taskwarden.toml` (user XDG config)
/// 4. `./taskwarden.toml` (local directory)
/// 5. `TASKWARDEN_*` environment variables
pub fn load_config() -> Result<TaskwardenConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TaskwardenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TaskwardenConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TaskwardenConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TaskwardenConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TaskwardenConfig::default()))
        .merge(Toml::file("/etc/taskwarden/taskwarden.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("taskwarden/taskwarden.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("taskwarden.toml"))
        .merge(env_provider())
}

/// Environment provider mapping the first `_`-separated segment to a section.
///
/// `TASKWARDEN_TELEGRAM_BOT_TOKEN` maps to `telegram.bot_token`, never to
/// `telegram.bot.token`. Keys outside a known section pass through unchanged
/// so `deny_unknown_fields` reports them. Figment hands over keys in their
/// original case, so matching happens on the lowercased key.
fn env_provider() -> Env {
    Env::prefixed("TASKWARDEN_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(map_env_key("auth_admin_password"), "auth.admin_password");
        assert_eq!(map_env_key("storage_backend"), "storage.backend");
        assert_eq!(map_env_key("reconciler_interval_secs"), "reconciler.interval_secs");
    }

    #[test]
    fn upper_case_env_keys_are_mapped() {
        assert_eq!(map_env_key("TELEGRAM_BOT_TOKEN"), "telegram.bot_token");
        assert_eq!(map_env_key("STORAGE_BACKEND"), "storage.backend");
        assert_eq!(map_env_key("Dispatcher_Workers"), "dispatcher.workers");
    }

    #[test]
    fn unknown_env_section_passes_through() {
        assert_eq!(map_env_key("nonsense_key"), "nonsense_key");
    }

    #[test]
    fn env_overrides_file_values() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "taskwarden.toml",
                r#"
[telegram]
bot_token = "from-file"

[dispatcher]
workers = 4
"#,
            )?;
            jail.set_env("TASKWARDEN_TELEGRAM_BOT_TOKEN", "from-env");
            jail.set_env("TASKWARDEN_STORAGE_BACKEND", "memory");

            let config = load_config()?;
            assert_eq!(config.telegram.bot_token.as_deref(), Some("from-env"));
            assert_eq!(config.dispatcher.workers, 4);
            assert_eq!(
                config.storage.backend,
                crate::model::StorageBackend::Memory
            );
            Ok(())
        });
    }
}
