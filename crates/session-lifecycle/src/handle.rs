//! Consumer-facing session handle.

use crate::controller::{Inner, SessionController};
use crate::error::ScopeError;
use crate::session::Session;
use crate::SessionResult;
use std::sync::{Arc, Weak};
use tokio::sync::watch;

/// Read access to the session plus the `login` / `logout` / `refresh`
/// commands.
///
/// A handle never keeps its controller alive. Every call made after the
/// controller was dropped or disposed, or on a [`SessionHandle::detached`]
/// handle, fails with [`ScopeError`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Weak<Inner>,
}

impl SessionHandle {
    pub(crate) fn new(inner: Weak<Inner>) -> Self {
        Self { inner }
    }

    /// A handle bound to no controller.
    pub fn detached() -> Self {
        Self { inner: Weak::new() }
    }

    fn controller(&self) -> Result<SessionController, ScopeError> {
        let inner: Arc<Inner> = self.inner.upgrade().ok_or(ScopeError)?;
        inner.ensure_active()?;
        Ok(SessionController::from_inner(inner))
    }

    pub fn snapshot(&self) -> Result<Session, ScopeError> {
        let controller = self.controller()?;
        controller.snapshot().map_err(|_| ScopeError)
    }

    pub fn subscribe(&self) -> Result<watch::Receiver<Session>, ScopeError> {
        let controller = self.controller()?;
        controller.subscribe().map_err(|_| ScopeError)
    }

    pub fn login(&self) -> SessionResult<()> {
        self.controller()?.login()
    }

    pub async fn logout(&self) -> SessionResult<()> {
        self.controller()?.logout().await
    }

    pub fn refresh(&self) -> SessionResult<()> {
        self.controller()?.refresh()
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::detached()
    }
}
