//! Secret sources backed by the OS keychain or static settings

use crate::clients::{Credentials, SecretSource};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use keyring::Entry;

const SERVICE: &str = "joinquant-sync";

/// Reads `{username, password}` JSON documents from the OS keychain
pub struct KeychainSecretSource {
    service: String,
}

impl KeychainSecretSource {
    pub fn new() -> Self {
        Self {
            service: SERVICE.to_string(),
        }
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    /// Store credentials under a secret id
    pub fn store(&self, secret_id: &str, credentials: &Credentials) -> Result<()> {
        let json = serde_json::to_string(credentials)?;
        let entry = Entry::new(&self.service, secret_id)?;
        entry.set_password(&json)?;
        Ok(())
    }

    fn read(&self, secret_id: &str) -> Result<Credentials> {
        let entry = Entry::new(&self.service, secret_id)?;

        match entry.get_password() {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(keyring::Error::NoEntry) => Err(AppError::NotFound(format!(
                "secret {} in keychain service {}",
                secret_id, self.service
            ))),
            Err(e) => Err(AppError::Keychain(e)),
        }
    }
}

impl Default for KeychainSecretSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretSource for KeychainSecretSource {
    async fn get(&self, secret_id: &str) -> Result<Credentials> {
        self.read(secret_id).map_err(|e| {
            AppError::ConfigUnavailable(format!("Failed to load secret {}: {}", secret_id, e))
        })
    }
}

/// Serves one fixed set of credentials, for hosts without a keychain
pub struct StaticSecretSource {
    credentials: Credentials,
}

impl StaticSecretSource {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            credentials: Credentials {
                username: username.to_string(),
                password: password.to_string(),
            },
        }
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    async fn get(&self, _secret_id: &str) -> Result<Credentials> {
        Ok(self.credentials.clone())
    }
}
