//! Credential storage for the session controller.
//!
//! Two backends sit behind one [`KeyValueStorage`] trait:
//! - [`FileStorage`]: survives restarts (bearer token, and the welcome flag
//!   for command-line embedders)
//! - [`MemoryStorage`]: lives as long as the process (welcome flag for
//!   long-running embedders, tests)
//!
//! [`CredentialStore`] pairs them and exposes the token and welcome-flag
//! operations the controller needs.

mod credentials;
mod file;
mod keys;
mod memory;
mod traits;

pub use credentials::CredentialStore;
pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::KeyValueStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// File-backed store for a command-line embedder.
///
/// The token file outlives everything. The session-state file plays the
/// role of a browser tab: it survives repeated invocations and is only
/// reset by login and logout.
pub fn create_credential_store(
    durable_path: impl Into<std::path::PathBuf>,
    session_state_path: impl Into<std::path::PathBuf>,
) -> CredentialStore {
    CredentialStore::new(
        Box::new(FileStorage::new(durable_path)),
        Box::new(FileStorage::new(session_state_path)),
    )
}

/// Both halves in memory. Nothing outlives the process.
pub fn create_memory_credential_store() -> CredentialStore {
    CredentialStore::new(Box::new(MemoryStorage::new()), Box::new(MemoryStorage::new()))
}
