//! Session lifecycle state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │      Init       │
//! └────────┬────────┘
//!          │ Start
//!          ▼
//! ┌─────────────────┐ ◄── Retry / Restart (self)
//! │   Determining   │
//! └────────┬────────┘
//!          │ Confirmed / Rejected
//!          ▼
//!   Authenticated / Unauthenticated ── Restart ──► Determining
//!
//! SignOut from any state lands in Unauthenticated. Having no credential
//! at all is a cycle rejected without a status query.
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Init)

    Init => {
        Start => Determining,
        SignOut => Unauthenticated
    },
    Determining => {
        Confirmed => Authenticated,
        Rejected => Unauthenticated,
        // Transient failure, another attempt is scheduled
        Retry => Determining,
        // A newer cycle supersedes the running one
        Restart => Determining,
        SignOut => Unauthenticated
    },
    Authenticated => {
        Restart => Determining,
        SignOut => Unauthenticated
    },
    Unauthenticated => {
        Restart => Determining,
        SignOut => Unauthenticated
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Lifecycle phase for external consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Controller constructed but not started.
    Init,
    /// Resolving whether the session is valid.
    Determining,
    Authenticated,
    Unauthenticated,
}

impl From<&SessionMachineState> for SessionPhase {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Init => SessionPhase::Init,
            SessionMachineState::Determining => SessionPhase::Determining,
            SessionMachineState::Authenticated => SessionPhase::Authenticated,
            SessionMachineState::Unauthenticated => SessionPhase::Unauthenticated,
        }
    }
}

/// Retry budget for one determination cycle.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Fixed wait before each retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt may follow attempt number `attempt` (0-indexed).
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Delay before the retry that follows `attempt`. The backoff is fixed.
    pub fn delay_for_attempt(&self, _attempt: u32) -> Duration {
        self.backoff
    }
}
