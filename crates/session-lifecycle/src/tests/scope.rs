//! Consumer handle scoping and disposal.

use super::harness::{logged_in, transient, TestHarness};
use crate::{ScopeError, SessionError, SessionHandle};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn detached_handle_reports_scope_error() {
    let handle = SessionHandle::detached();

    assert_eq!(handle.snapshot(), Err(ScopeError));
    assert!(handle.subscribe().is_err());
    assert!(matches!(handle.login(), Err(SessionError::Scope(ScopeError))));
    assert!(matches!(handle.refresh(), Err(SessionError::Scope(ScopeError))));
    assert!(matches!(
        handle.logout().await,
        Err(SessionError::Scope(ScopeError))
    ));
}

#[tokio::test(start_paused = true)]
async fn handle_follows_controller_while_active() {
    let harness = TestHarness::with_token("stored");
    harness.fetcher.push(logged_in());
    let controller = harness.controller();
    let handle = controller.handle();

    let _started = controller.start(None).unwrap();
    let settled = controller.settled().await.unwrap();

    assert_eq!(handle.snapshot().unwrap(), settled);

    let mut rx = handle.subscribe().unwrap();
    handle.refresh().unwrap();
    assert!(rx.borrow_and_update().loading());
}

#[tokio::test(start_paused = true)]
async fn handle_outliving_controller_reports_scope_error() {
    let harness = TestHarness::new();
    let controller = harness.controller();
    let handle = controller.handle();

    assert!(handle.snapshot().is_ok());
    drop(controller);

    assert_eq!(handle.snapshot(), Err(ScopeError));
    assert!(matches!(handle.refresh(), Err(SessionError::Scope(_))));
}

#[tokio::test(start_paused = true)]
async fn dispose_halts_pending_retries() {
    let harness = TestHarness::with_token("stored");
    harness.fetcher.set_fallback(transient());
    let controller = harness.controller();
    let handle = controller.handle();

    let started = controller.start(None).unwrap();
    harness.fetcher.wait_for_calls(1).await;

    started.disposer.dispose();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(harness.fetcher.call_count(), 1);
    assert_eq!(handle.snapshot(), Err(ScopeError));
    assert!(matches!(controller.refresh(), Err(SessionError::Scope(_))));
    assert!(matches!(controller.start(None), Err(SessionError::Scope(_))));
}

#[tokio::test(start_paused = true)]
async fn dispose_after_settling_keeps_store_intact() {
    let harness = TestHarness::with_token("stored");
    harness.fetcher.push(logged_in());
    let controller = harness.controller();

    let started = controller.start(None).unwrap();
    controller.settled().await.unwrap();
    started.disposer.dispose();

    assert_eq!(harness.token().as_deref(), Some("stored"));
    assert!(harness.store.get_welcome_flag().unwrap());
}

#[tokio::test(start_paused = true)]
async fn dispose_releases_pending_settled_waiters() {
    let harness = TestHarness::with_token("stored");
    harness
        .fetcher
        .push_delayed(Duration::from_secs(5), logged_in());
    let controller = harness.controller();
    let mut rx = controller.subscribe().unwrap();

    let started = controller.start(None).unwrap();
    harness.fetcher.wait_for_calls(1).await;

    let waiter = tokio::spawn({
        let controller = controller.clone();
        async move { controller.settled().await }
    });
    tokio::task::yield_now().await;

    started.disposer.dispose();

    let result = tokio::time::timeout(Duration::from_secs(60), waiter)
        .await
        .expect("settled() should return once the controller is disposed")
        .unwrap();
    assert!(matches!(result, Err(SessionError::Scope(ScopeError))));

    let last = rx.borrow_and_update().clone();
    assert!(!last.loading());
    assert!(!last.is_authenticated());
    assert_eq!(harness.notifier.count(), 0);
}
