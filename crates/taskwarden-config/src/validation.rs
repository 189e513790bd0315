// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints that serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::{StorageBackend, TaskwardenConfig};

/// Argon2 refuses memory costs below 8 KiB per lane.
const MIN_KDF_MEMORY_PER_LANE: u32 = 8;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first.
pub fn validate_config(config: &TaskwardenConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.dispatcher.workers == 0 {
        fail("dispatcher.workers must be at least 1".to_string());
    }

    if config.reconciler.interval_secs == 0 {
        fail("reconciler.interval_secs must be at least 1".to_string());
    }

    if config.telegram.poll_timeout_secs == 0 {
        fail("telegram.poll_timeout_secs must be at least 1".to_string());
    }

    if let Some(token) = &config.telegram.bot_token {
        if token.trim().is_empty() {
            fail("telegram.bot_token must not be empty when set".to_string());
        }
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        fail("storage.database_path must not be empty for the sqlite backend".to_string());
    }

    let auth = &config.auth;
    if auth.kdf_parallelism < 1 {
        fail(format!(
            "auth.kdf_parallelism must be at least 1, got {}",
            auth.kdf_parallelism
        ));
    }
    if auth.kdf_iterations < 1 {
        fail(format!(
            "auth.kdf_iterations must be at least 1, got {}",
            auth.kdf_iterations
        ));
    }
    let min_memory = MIN_KDF_MEMORY_PER_LANE * auth.kdf_parallelism.max(1);
    if auth.kdf_memory_cost < min_memory {
        fail(format!(
            "auth.kdf_memory_cost must be at least {min_memory} KiB, got {}",
            auth.kdf_memory_cost
        ));
    }

    for (role, password) in [
        ("executor", &auth.executor_password),
        ("observer", &auth.observer_password),
        ("chief", &auth.chief_password),
        ("admin", &auth.admin_password),
    ] {
        if password.as_deref().is_some_and(str::is_empty) {
            fail(format!("auth.{role}_password must not be empty when set"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&TaskwardenConfig::default()).is_ok());
    }

    #[test]
    fn all_failures_are_collected() {
        let mut config = TaskwardenConfig::default();
        config.dispatcher.workers = 0;
        config.reconciler.interval_secs = 0;
        config.auth.admin_password = Some(String::new());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn empty_database_path_is_fine_for_memory_backend() {
        let mut config = TaskwardenConfig::default();
        config.storage.database_path = String::new();
        assert!(validate_config(&config).is_err());

        config.storage.backend = StorageBackend::Memory;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn kdf_memory_must_cover_all_lanes() {
        let mut config = TaskwardenConfig::default();
        config.auth.kdf_parallelism = 4;
        config.auth.kdf_memory_cost = 16;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("at least 32 KiB"));
    }
}
