// SPDX-FileCopyrightText: 2026 Taskwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Role passwords.
//!
//! Each assignable role owns one Argon2id hash in PHC string form. Hashes are
//! resolved once at startup from `[auth]`: a value starting with `$argon2` is
//! taken as an existing hash, anything else is hashed with a fresh salt.

use std::collections::HashMap;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use taskwarden_config::model::AuthConfig;
use taskwarden_core::{Role, TaskwardenError};

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub memory_cost: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl KdfParams {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            memory_cost: config.kdf_memory_cost,
            iterations: config.kdf_iterations,
            parallelism: config.kdf_parallelism,
        }
    }

    fn argon2(self) -> Result<Argon2<'static>, TaskwardenError> {
        let params = Params::new(self.memory_cost, self.iterations, self.parallelism, None)
            .map_err(|e| TaskwardenError::Auth(format!("invalid Argon2id parameters: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Generate a random 16-byte salt, encoded for a PHC string.
fn generate_salt() -> Result<SaltString, TaskwardenError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; 16];
    rng.fill(&mut salt)
        .map_err(|_| TaskwardenError::Auth("failed to generate random salt".to_string()))?;
    SaltString::encode_b64(&salt)
        .map_err(|e| TaskwardenError::Auth(format!("failed to encode salt: {e}")))
}

/// Hash `password` into an Argon2id PHC string.
pub fn hash_password(password: &SecretString, params: KdfParams) -> Result<String, TaskwardenError> {
    let salt = generate_salt()?;
    let hash = params
        .argon2()?
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|e| TaskwardenError::Auth(format!("Argon2id hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Password hashes for every role that can be acquired.
#[derive(Clone, Default)]
pub struct RoleSecrets {
    hashes: HashMap<Role, String>,
}

impl std::fmt::Debug for RoleSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut roles: Vec<&Role> = self.hashes.keys().collect();
        roles.sort_by_key(|r| r.as_ref().to_string());
        f.debug_struct("RoleSecrets").field("roles", &roles).finish()
    }
}

impl RoleSecrets {
    /// Resolves the configured role passwords into hashes.
    pub fn from_config(config: &AuthConfig) -> Result<Self, TaskwardenError> {
        let params = KdfParams::from_config(config);
        let mut secrets = Self::default();
        for role in Role::ASSIGNABLE {
            let configured = match role {
                Role::Executor => config.executor_password.as_deref(),
                Role::Observer => config.observer_password.as_deref(),
                Role::Chief => config.chief_password.as_deref(),
                Role::Admin => config.admin_password.as_deref(),
                Role::Unknown => None,
            };
            match configured {
                Some(value) => secrets.insert(role, value, params)?,
                None => warn!(role = %role, "no password configured, role cannot be acquired"),
            }
        }
        Ok(secrets)
    }

    /// Sets the password for `role`, hashing plain text with `params`.
    pub fn insert(
        &mut self,
        role: Role,
        value: &str,
        params: KdfParams,
    ) -> Result<(), TaskwardenError> {
        let hash = if value.starts_with("$argon2") {
            PasswordHash::new(value).map_err(|e| {
                TaskwardenError::Auth(format!("malformed password hash for role {role}: {e}"))
            })?;
            value.to_string()
        } else {
            hash_password(&SecretString::from(value.to_string()), params)?
        };
        debug!(role = %role, "role password loaded");
        self.hashes.insert(role, hash);
        Ok(())
    }

    /// Whether `candidate` is the password of `role`.
    ///
    /// Always false for a role without a configured password.
    pub fn verify(&self, role: Role, candidate: &SecretString) -> bool {
        let Some(stored) = self.hashes.get(&role) else {
            return false;
        };
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        Argon2::default()
            .verify_password(candidate.expose_secret().as_bytes(), &parsed)
            .is_ok()
    }

    pub fn has_password(&self, role: Role) -> bool {
        self.hashes.contains_key(&role)
    }
}
