//! Controller scenario tests.
//!
//! - `harness.rs`   - Scripted fetcher, recording notifier and navigator
//! - `startup.rs`   - Redirect markers and first determination
//! - `retry.rs`     - Settle delay and bounded retries
//! - `welcome.rs`   - At-most-once welcome notices
//! - `logout.rs`    - Local sign-out and remote confirmation
//! - `supersede.rs` - Refresh and stale-result handling
//! - `scope.rs`     - Consumer handle scoping and disposal

mod scope;
mod welcome;
