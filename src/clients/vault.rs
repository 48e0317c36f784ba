//! Token storage in the OS-native keychain.
//!
//! Tokens are keyed by (service, account alias) and never written to any of
//! our own files:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: kernel keyutils

#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

/// Service name under which all tokens are stored.
pub const SERVICE: &str = "bettergit";

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Cannot access the OS keychain: {0}")]
    AccessDenied(String),

    #[error("Failed to store credential: {0}")]
    StoreFailed(String),

    #[error("Failed to delete credential: {0}")]
    DeleteFailed(String),

    #[error("Keychain error: {0}")]
    Internal(String),
}

impl From<keyring::Error> for VaultError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoStorageAccess(_) => {
                VaultError::AccessDenied("no access to keychain storage".to_string())
            }
            _ => VaultError::Internal(err.to_string()),
        }
    }
}

/// Credential store keyed by (service, account).
#[cfg_attr(test, automock)]
pub trait Vault {
    fn get(&self, service: &str, account: &str) -> Result<Option<String>, VaultError>;
    fn set(&self, service: &str, account: &str, token: &str) -> Result<(), VaultError>;
    /// Returns whether a credential existed.
    fn delete(&self, service: &str, account: &str) -> Result<bool, VaultError>;
}

/// Vault backed by the `keyring` crate.
#[derive(Default)]
pub struct KeyringVault;

impl Vault for KeyringVault {
    fn get(&self, service: &str, account: &str) -> Result<Option<String>, VaultError> {
        let entry = keyring::Entry::new(service, account)?;
        match entry.get_password() {
            Ok(token) => {
                debug!("Retrieved credential for account '{}'", account);
                Ok(Some(token))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, service: &str, account: &str, token: &str) -> Result<(), VaultError> {
        let entry = keyring::Entry::new(service, account)?;
        entry.set_password(token).map_err(|e| {
            warn!("Failed to store credential for account '{}': {}", account, e);
            VaultError::StoreFailed(e.to_string())
        })?;
        debug!("Stored credential for account '{}'", account);
        Ok(())
    }

    fn delete(&self, service: &str, account: &str) -> Result<bool, VaultError> {
        let entry = keyring::Entry::new(service, account)?;
        match entry.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(VaultError::DeleteFailed(e.to_string())),
        }
    }
}
