//! Client-side session lifecycle.
//!
//! This crate provides:
//! - OAuth return-URL interpretation (`auth=success` and `token=` markers)
//! - Status queries over HTTP with bearer or cookie credentials
//! - A generation-guarded controller with bounded retries
//! - At-most-once welcome notices per ephemeral scope
//! - Explicit FSM-based session state management

mod controller;
mod error;
mod handle;
mod redirect;
mod session;
mod session_fsm;
mod sinks;
mod status;

#[cfg(test)]
mod tests;

pub use controller::{ControllerSettings, SessionController, SessionDisposer, Started};
pub use error::{ScopeError, SessionError, SessionResult};
pub use handle::SessionHandle;
pub use redirect::{classify, Classification, RedirectOutcome};
pub use session::{Credential, Session, UserProfile};
pub use session_fsm::session_machine;
pub use session_fsm::{
    RetryPolicy, SessionMachine, SessionMachineInput, SessionMachineState, SessionPhase,
};
pub use sinks::{welcome_message, Navigator, WelcomeNotifier};
pub use status::{
    classify_error, classify_response, FetcherSettings, HttpStatusFetcher, RequestDescriptor,
    StatusFetcher, StatusResult,
};
