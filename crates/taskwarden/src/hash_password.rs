// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `taskwarden hash-password` command implementation.

use std::io::IsTerminal;

use secrecy::SecretString;
use zeroize::Zeroize;

use taskwarden_bot::auth::{KdfParams, hash_password};
use taskwarden_config::model::AuthConfig;
use taskwarden_core::TaskwardenError;

/// Prompts for a password twice and prints its Argon2id PHC string.
pub fn run_hash_password(config: &AuthConfig) -> Result<(), TaskwardenError> {
    let password = read_password()?;
    let hash = hash_password(&password, KdfParams::from_config(config))?;
    println!("{hash}");
    Ok(())
}

fn read_password() -> Result<SecretString, TaskwardenError> {
    if !std::io::stdin().is_terminal() {
        return Err(TaskwardenError::Auth(
            "hash-password must be run from an interactive terminal".to_string(),
        ));
    }

    eprint!("Password: ");
    let mut first = rpassword::read_password()
        .map_err(|e| TaskwardenError::Auth(format!("failed to read password: {e}")))?;
    eprint!("Confirm password: ");
    let mut second = rpassword::read_password()
        .map_err(|e| TaskwardenError::Auth(format!("failed to read password: {e}")))?;

    let matches = first == second;
    second.zeroize();
    if !matches {
        first.zeroize();
        return Err(TaskwardenError::Auth("passwords do not match".to_string()));
    }
    if first.is_empty() {
        return Err(TaskwardenError::Auth("empty password not allowed".to_string()));
    }
    Ok(SecretString::from(first))
}
