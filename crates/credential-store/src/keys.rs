//! Storage key constants.

/// Keys written by the credential store.
pub struct StorageKeys;

impl StorageKeys {
    /// Bearer token (durable)
    pub const AUTH_TOKEN: &'static str = "authToken";

    /// Presence-only "already greeted" flag (tab-scoped)
    pub const HAS_WELCOMED: &'static str = "hasWelcomed";
}
