//! High-level API for the session's credentials.

use crate::{KeyValueStorage, StorageKeys, StorageResult};

const FLAG_PRESENT: &str = "true";

/// Token and welcome-flag storage used by the session controller.
///
/// The token lives in the durable backend; the welcome flag lives in the
/// ephemeral (tab-scoped) backend. No validation happens here.
pub struct CredentialStore {
    durable: Box<dyn KeyValueStorage>,
    ephemeral: Box<dyn KeyValueStorage>,
}

impl CredentialStore {
    pub fn new(durable: Box<dyn KeyValueStorage>, ephemeral: Box<dyn KeyValueStorage>) -> Self {
        Self { durable, ephemeral }
    }

    pub fn get_token(&self) -> StorageResult<Option<String>> {
        self.durable.get(StorageKeys::AUTH_TOKEN)
    }

    pub fn set_token(&self, token: &str) -> StorageResult<()> {
        self.durable.set(StorageKeys::AUTH_TOKEN, token)
    }

    pub fn clear_token(&self) -> StorageResult<()> {
        if self.durable.delete(StorageKeys::AUTH_TOKEN)? {
            tracing::debug!("auth token removed from durable storage");
        }
        Ok(())
    }

    pub fn get_welcome_flag(&self) -> StorageResult<bool> {
        self.ephemeral.has(StorageKeys::HAS_WELCOMED)
    }

    pub fn set_welcome_flag(&self) -> StorageResult<()> {
        self.ephemeral.set(StorageKeys::HAS_WELCOMED, FLAG_PRESENT)
    }

    pub fn clear_welcome_flag(&self) -> StorageResult<()> {
        self.ephemeral.delete(StorageKeys::HAS_WELCOMED)?;
        Ok(())
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}
