//! Session controller.
//!
//! Owns the session state machine and drives determination cycles: read
//! the return URL, pick a credential, query status, retry transient
//! failures, then publish exactly one settled [`Session`].
//!
//! Every cycle carries a generation number. `refresh`, `logout` and
//! disposal bump the generation, and a cycle only commits its result while
//! its generation is still current. A slow answer from an older cycle is
//! therefore dropped instead of overwriting a newer one.

use crate::error::ScopeError;
use crate::handle::SessionHandle;
use crate::redirect::{classify, RedirectOutcome};
use crate::session::{Credential, Session, UserProfile};
use crate::session_fsm::{RetryPolicy, SessionMachine, SessionMachineInput, SessionPhase};
use crate::sinks::{Navigator, WelcomeNotifier};
use crate::status::{StatusFetcher, StatusResult};
use crate::{SessionError, SessionResult};
use credential_store::CredentialStore;
use parking_lot::Mutex;
use session_config::{Config, CredentialMode};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Controller behaviour derived from [`Config`].
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub credential_mode: CredentialMode,
    pub retry: RetryPolicy,
    /// Wait after `auth=success` before the first status query.
    pub settle_delay: Duration,
    pub login_url: Url,
    pub logout_url: Url,
    pub post_logout_url: Url,
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> SessionResult<Self> {
        Ok(Self {
            credential_mode: config.credential_mode,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff: config.retry_backoff(),
            },
            settle_delay: config.settle_delay(),
            login_url: config.login_url()?,
            logout_url: config.logout_url()?,
            post_logout_url: config.post_logout_url()?,
        })
    }
}

/// Returned by [`SessionController::start`].
#[must_use = "dropping the disposer leaves pending retries running"]
#[derive(Debug)]
pub struct Started {
    /// URL without OAuth markers, when the input carried any. The embedder
    /// should replace its visible URL with it.
    pub cleaned_url: Option<Url>,
    pub disposer: SessionDisposer,
}

/// Per-cycle parameters fixed when the cycle begins.
#[derive(Debug, Clone, Default)]
struct CyclePlan {
    settle_delay: Option<Duration>,
    /// Upstream claimed success, so a negative answer may be propagation lag.
    expects_session: bool,
    /// Token delivered by the return URL of this load.
    marker_token: Option<String>,
}

enum Step {
    Done,
    Retry(Duration),
}

struct Machine {
    fsm: SessionMachine,
    generation: u64,
    started: bool,
    disposed: bool,
}

impl Machine {
    fn transition(&mut self, input: &SessionMachineInput) -> SessionResult<SessionPhase> {
        let old_phase = SessionPhase::from(self.fsm.state());

        self.fsm.consume(input).map_err(|_| {
            SessionError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                self.fsm.state()
            ))
        })?;

        let new_phase = SessionPhase::from(self.fsm.state());
        if old_phase != new_phase {
            debug!(
                old_phase = ?old_phase,
                new_phase = ?new_phase,
                "Session phase transition"
            );
        }
        Ok(new_phase)
    }

    fn apply(&mut self, input: SessionMachineInput) {
        if let Err(e) = self.transition(&input) {
            warn!(error = %e, "Ignoring session transition");
        }
    }

    /// Enter `Determining` under a fresh generation. Results tagged with an
    /// older generation are dropped from here on.
    fn begin_cycle(&mut self) -> u64 {
        self.generation += 1;
        let input = match SessionPhase::from(self.fsm.state()) {
            SessionPhase::Init => SessionMachineInput::Start,
            _ => SessionMachineInput::Restart,
        };
        self.apply(input);
        self.generation
    }
}

pub(crate) struct Inner {
    settings: ControllerSettings,
    store: Arc<CredentialStore>,
    fetcher: Arc<dyn StatusFetcher>,
    notifier: Arc<dyn WelcomeNotifier>,
    navigator: Arc<dyn Navigator>,
    machine: Mutex<Machine>,
    session_tx: watch::Sender<Session>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Drives the session lifecycle and publishes [`Session`] snapshots.
///
/// Cheap to clone. Consumers that must not keep the controller alive
/// should hold a [`SessionHandle`] instead.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn new(
        settings: ControllerSettings,
        store: Arc<CredentialStore>,
        fetcher: Arc<dyn StatusFetcher>,
        notifier: Arc<dyn WelcomeNotifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (session_tx, _) = watch::channel(Session::initial());
        Self {
            inner: Arc::new(Inner {
                settings,
                store,
                fetcher,
                notifier,
                navigator,
                machine: Mutex::new(Machine {
                    fsm: SessionMachine::new(),
                    generation: 0,
                    started: false,
                    disposed: false,
                }),
                session_tx,
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    /// Consumer handle that does not keep the controller alive.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(self.downgrade())
    }

    /// Begin the lifecycle.
    ///
    /// `current_url` is the address the process was opened with, if any.
    /// OAuth markers found there are persisted or scheduled and the
    /// stripped URL is returned. May be called once per controller.
    pub fn start(&self, current_url: Option<&Url>) -> SessionResult<Started> {
        {
            let mut machine = self.inner.machine.lock();
            if machine.disposed {
                return Err(ScopeError.into());
            }
            if machine.started {
                return Err(SessionError::AlreadyStarted);
            }
            machine.started = true;
        }

        let (outcome, cleaned_url) = match current_url {
            Some(url) => {
                let classification = classify(url);
                let cleaned = classification.replacement_for(url).cloned();
                (classification.outcome, cleaned)
            }
            None => (RedirectOutcome::None, None),
        };
        debug!(outcome = ?outcome, "Classified return URL");

        let plan = match outcome {
            RedirectOutcome::TokenMarker(token) => {
                if let Err(e) = self.inner.store.set_token(&token) {
                    warn!(error = %e, "Failed to persist token from return URL");
                }
                info!("Token received from login redirect");
                CyclePlan {
                    marker_token: Some(token),
                    ..CyclePlan::default()
                }
            }
            RedirectOutcome::SuccessMarker => {
                info!("Login redirect reported success, waiting for session to settle");
                CyclePlan {
                    settle_delay: Some(self.inner.settings.settle_delay),
                    expects_session: true,
                    ..CyclePlan::default()
                }
            }
            RedirectOutcome::None if self.inner.has_credential() => CyclePlan::default(),
            RedirectOutcome::None => {
                info!("No stored credential, skipping status query");
                let generation = self.inner.machine.lock().begin_cycle();
                self.inner.commit_unauthenticated(generation, false);
                return Ok(Started {
                    cleaned_url,
                    disposer: SessionDisposer::new(self.downgrade()),
                });
            }
        };

        let generation = self.inner.machine.lock().begin_cycle();
        self.inner.spawn_cycle(generation, plan);

        Ok(Started {
            cleaned_url,
            disposer: SessionDisposer::new(self.downgrade()),
        })
    }

    /// Latest published session.
    pub fn snapshot(&self) -> SessionResult<Session> {
        self.inner.ensure_active()?;
        Ok(self.inner.session_tx.borrow().clone())
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from(self.inner.machine.lock().fsm.state())
    }

    /// Receiver notified on every published session.
    pub fn subscribe(&self) -> SessionResult<watch::Receiver<Session>> {
        self.inner.ensure_active()?;
        Ok(self.inner.session_tx.subscribe())
    }

    /// Wait until the published session is no longer loading.
    ///
    /// Fails with [`ScopeError`] if the controller is disposed first.
    pub async fn settled(&self) -> SessionResult<Session> {
        let mut rx = self.subscribe()?;
        let session = rx
            .wait_for(|session| !session.loading())
            .await
            .map_err(|_| ScopeError)?
            .clone();
        self.inner.ensure_active()?;
        Ok(session)
    }

    /// Start a new determination cycle without redirect interpretation.
    ///
    /// Identity stays visible while loading; any cycle still running is
    /// superseded.
    pub fn refresh(&self) -> SessionResult<()> {
        let generation = {
            let mut machine = self.inner.machine.lock();
            if machine.disposed {
                return Err(ScopeError.into());
            }
            let generation = machine.begin_cycle();
            self.inner.session_tx.send_modify(|session| *session = session.reloading());
            generation
        };

        debug!(generation, "Refreshing session");
        self.inner.spawn_cycle(generation, CyclePlan::default());
        Ok(())
    }

    /// Clear the welcome flag and navigate to the remote login endpoint.
    pub fn login(&self) -> SessionResult<()> {
        self.inner.ensure_active()?;
        if let Err(e) = self.inner.store.clear_welcome_flag() {
            warn!(error = %e, "Failed to clear welcome flag before login");
        }
        info!(url = %self.inner.settings.login_url, "Redirecting to login");
        self.inner.navigator.navigate(&self.inner.settings.login_url)
    }

    /// Sign out locally, then ask the remote to end its session.
    ///
    /// Local state is cleared before the remote call and regardless of its
    /// outcome. Navigates to the post-logout page on success and to the
    /// remote logout endpoint otherwise.
    pub async fn logout(&self) -> SessionResult<()> {
        let credential = {
            let mut machine = self.inner.machine.lock();
            if machine.disposed {
                return Err(ScopeError.into());
            }
            let credential = self.inner.credential_for(&CyclePlan::default());

            machine.generation += 1;
            if let Err(e) = self.inner.store.clear_token() {
                warn!(error = %e, "Failed to clear token during logout");
            }
            if let Err(e) = self.inner.store.clear_welcome_flag() {
                warn!(error = %e, "Failed to clear welcome flag during logout");
            }
            machine.apply(SessionMachineInput::SignOut);
            self.inner.session_tx.send_replace(Session::unauthenticated());
            credential
        };
        self.inner.abort_tasks();
        info!("Signed out locally");

        let target = match self.inner.fetcher.confirm_logout(&credential).await {
            Ok(()) => &self.inner.settings.post_logout_url,
            Err(e) => {
                warn!(error = %e, "Remote logout failed, falling back to logout endpoint");
                &self.inner.settings.logout_url
            }
        };
        self.inner.navigator.navigate(target)
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl Inner {
    pub(crate) fn ensure_active(&self) -> Result<(), ScopeError> {
        if self.machine.lock().disposed {
            Err(ScopeError)
        } else {
            Ok(())
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        let machine = self.machine.lock();
        !machine.disposed && machine.generation == generation
    }

    /// Whether a status query has anything to authenticate with.
    fn has_credential(&self) -> bool {
        match self.settings.credential_mode {
            // The cookie jar is opaque from here; ask the server.
            CredentialMode::Cookie => true,
            CredentialMode::Bearer => match self.store.get_token() {
                Ok(token) => token.is_some(),
                Err(e) => {
                    warn!(error = %e, "Failed to read stored token");
                    false
                }
            },
        }
    }

    fn credential_for(&self, plan: &CyclePlan) -> Credential {
        if let Some(token) = &plan.marker_token {
            return Credential::Bearer(token.clone());
        }
        match self.settings.credential_mode {
            CredentialMode::Cookie => Credential::Ambient,
            CredentialMode::Bearer => match self.store.get_token() {
                Ok(Some(token)) => Credential::Bearer(token),
                Ok(None) => Credential::Ambient,
                Err(e) => {
                    warn!(error = %e, "Failed to read stored token");
                    Credential::Ambient
                }
            },
        }
    }

    fn spawn_cycle(self: &Arc<Self>, generation: u64, plan: CyclePlan) {
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move { inner.determine(generation, plan).await });

        let mut tasks = self.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    fn abort_tasks(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }

    async fn determine(&self, generation: u64, plan: CyclePlan) {
        if let Some(delay) = plan.settle_delay {
            debug!(delay_ms = delay.as_millis() as u64, "Waiting before status query");
            tokio::time::sleep(delay).await;
        }

        let mut attempt = 0u32;
        loop {
            if !self.is_current(generation) {
                debug!(generation, "Cycle superseded before query");
                return;
            }

            let credential = self.credential_for(&plan);
            debug!(generation, attempt = attempt + 1, credential = ?credential, "Querying status");
            let result = self.fetcher.fetch(&credential).await;
            debug!(generation, result = result.label(), "Status query finished");

            match self.settle(generation, attempt, &plan, result) {
                Step::Done => return,
                Step::Retry(delay) => {
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn settle(&self, generation: u64, attempt: u32, plan: &CyclePlan, result: StatusResult) -> Step {
        let retry = &self.settings.retry;
        let can_retry = retry.allows_retry(attempt);
        let purge_marker = plan.marker_token.is_some();

        match result {
            StatusResult::LoggedIn(user) => {
                self.commit_authenticated(generation, user);
                Step::Done
            }
            StatusResult::TransientFailure(reason) if can_retry => {
                info!(attempt = attempt + 1, reason = %reason, "Status query failed, retrying");
                self.schedule_retry(generation, retry.delay_for_attempt(attempt))
            }
            StatusResult::LoggedOut if plan.expects_session && can_retry => {
                info!(attempt = attempt + 1, "Session not visible yet, retrying");
                self.schedule_retry(generation, retry.delay_for_attempt(attempt))
            }
            StatusResult::TransientFailure(reason) => {
                warn!(reason = %reason, "Status query retries exhausted");
                self.commit_unauthenticated(generation, purge_marker);
                Step::Done
            }
            StatusResult::LoggedOut => {
                self.commit_unauthenticated(generation, purge_marker);
                Step::Done
            }
            StatusResult::ProtocolFailure(reason) => {
                warn!(reason = %reason, "Unexpected status response, treating as logged out");
                self.commit_unauthenticated(generation, purge_marker);
                Step::Done
            }
            StatusResult::AuthFailure => {
                info!("Credential rejected by server");
                self.commit_unauthenticated(generation, true);
                Step::Done
            }
        }
    }

    fn schedule_retry(&self, generation: u64, delay: Duration) -> Step {
        let mut machine = self.machine.lock();
        if machine.disposed || machine.generation != generation {
            return Step::Done;
        }
        machine.apply(SessionMachineInput::Retry);
        Step::Retry(delay)
    }

    fn commit_authenticated(&self, generation: u64, user: UserProfile) {
        let welcome = {
            let mut machine = self.machine.lock();
            if machine.disposed || machine.generation != generation {
                debug!(generation, "Discarding result of superseded cycle");
                return;
            }
            machine.apply(SessionMachineInput::Confirmed);

            // Checked and set under the lock so concurrent cycles welcome once.
            let welcome = match self.store.get_welcome_flag() {
                Ok(welcomed) => !welcomed,
                Err(e) => {
                    warn!(error = %e, "Failed to read welcome flag");
                    false
                }
            };
            if welcome {
                if let Err(e) = self.store.set_welcome_flag() {
                    warn!(error = %e, "Failed to set welcome flag");
                }
            }
            self.session_tx.send_replace(Session::authenticated(user.clone()));
            welcome
        };

        info!(username = %user.username, "Session authenticated");
        if welcome {
            self.notifier.welcome(&user);
        }
    }

    fn commit_unauthenticated(&self, generation: u64, purge_token: bool) {
        let mut machine = self.machine.lock();
        if machine.disposed || machine.generation != generation {
            debug!(generation, "Discarding result of superseded cycle");
            return;
        }
        if purge_token {
            match self.store.clear_token() {
                Ok(()) => info!("Stored token purged"),
                Err(e) => warn!(error = %e, "Failed to purge stored token"),
            }
        }
        machine.apply(SessionMachineInput::Rejected);
        self.session_tx.send_replace(Session::unauthenticated());
        drop(machine);
        info!("Session unauthenticated");
    }

    fn dispose(&self) {
        {
            let mut machine = self.machine.lock();
            if machine.disposed {
                return;
            }
            machine.disposed = true;
            machine.generation += 1;

            // Nothing will settle an aborted cycle; fail closed so waiters wake.
            self.session_tx.send_if_modified(|session| {
                if session.loading() {
                    *session = Session::unauthenticated();
                    true
                } else {
                    false
                }
            });
        }
        self.abort_tasks();
        debug!("Session controller disposed");
    }
}

/// Stops pending timers and in-flight cycles when disposed.
///
/// After disposal the controller ignores late results and its handles
/// report [`ScopeError`].
#[derive(Debug)]
pub struct SessionDisposer {
    inner: Weak<Inner>,
}

impl SessionDisposer {
    fn new(inner: Weak<Inner>) -> Self {
        Self { inner }
    }

    pub fn dispose(self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.dispose();
        }
    }
}
