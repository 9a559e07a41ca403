//! Session data model.

use serde::{Deserialize, Serialize};

/// Remote-supplied identity record. Only used for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Everything else the remote sends, carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Display name when the remote provided a non-empty one, otherwise the
    /// username.
    pub fn display_label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

/// Snapshot of the authenticated identity, or the absence of one.
///
/// Fields are private so that a user can only be present together with
/// `is_authenticated == true`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    is_authenticated: bool,
    user: Option<UserProfile>,
    loading: bool,
}

impl Session {
    /// `{false, null, true}`: the state before anything is known.
    pub fn initial() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            loading: true,
        }
    }

    pub fn authenticated(user: UserProfile) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
            loading: false,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            loading: false,
        }
    }

    /// Same identity, marked as being re-determined.
    pub fn reloading(&self) -> Self {
        Self {
            loading: true,
            ..self.clone()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::initial()
    }
}

/// What a status query is authenticated with.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Whatever the HTTP client carries implicitly (session cookie).
    Ambient,
    /// Explicit bearer token.
    Bearer(String),
}

impl Credential {
    pub fn bearer_token(&self) -> Option<&str> {
        match self {
            Credential::Bearer(token) => Some(token),
            Credential::Ambient => None,
        }
    }
}

// Tokens never show up in logs or panics.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Ambient => f.write_str("Ambient"),
            Credential::Bearer(_) => f.write_str("Bearer(..)"),
        }
    }
}
