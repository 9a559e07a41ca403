//! Welcome notices fire at most once per ephemeral scope.

use super::harness::{logged_in, TestHarness, LOGIN_URL};
use crate::session::UserProfile;
use crate::status::StatusResult;

#[tokio::test(start_paused = true)]
async fn repeated_refreshes_welcome_once() {
    let harness = TestHarness::with_token("stored");
    harness.fetcher.set_fallback(logged_in());
    let controller = harness.controller();

    let _started = controller.start(None).unwrap();
    controller.settled().await.unwrap();

    for _ in 0..5 {
        controller.refresh().unwrap();
        assert!(controller.settled().await.unwrap().is_authenticated());
    }

    assert_eq!(harness.fetcher.call_count(), 6);
    assert_eq!(harness.notifier.count(), 1);
    assert!(harness.store.get_welcome_flag().unwrap());
}

#[tokio::test(start_paused = true)]
async fn existing_flag_suppresses_welcome() {
    let harness = TestHarness::with_token("stored");
    harness.store.set_welcome_flag().unwrap();
    harness.fetcher.push(logged_in());
    let controller = harness.controller();

    let _started = controller.start(None).unwrap();
    assert!(controller.settled().await.unwrap().is_authenticated());

    assert_eq!(harness.notifier.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn login_rearms_welcome() {
    let harness = TestHarness::with_token("stored");
    harness.fetcher.set_fallback(logged_in());
    let controller = harness.controller();

    let _started = controller.start(None).unwrap();
    controller.settled().await.unwrap();
    assert_eq!(harness.notifier.count(), 1);

    controller.login().unwrap();
    assert!(!harness.store.get_welcome_flag().unwrap());
    assert_eq!(harness.navigator.visited(), vec![LOGIN_URL.to_string()]);

    controller.refresh().unwrap();
    controller.settled().await.unwrap();
    assert_eq!(harness.notifier.count(), 2);
}

#[tokio::test(start_paused = true)]
async fn welcome_falls_back_to_username() {
    let harness = TestHarness::with_token("stored");
    harness
        .fetcher
        .push(StatusResult::LoggedIn(UserProfile::new("octocat")));
    let controller = harness.controller();

    let _started = controller.start(None).unwrap();
    controller.settled().await.unwrap();

    assert_eq!(harness.notifier.messages(), vec!["Welcome, octocat!".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn unauthenticated_result_does_not_welcome() {
    let harness = TestHarness::with_token("stored");
    harness.fetcher.push(StatusResult::AuthFailure);
    let controller = harness.controller();

    let _started = controller.start(None).unwrap();
    controller.settled().await.unwrap();

    assert_eq!(harness.notifier.count(), 0);
    assert!(!harness.store.get_welcome_flag().unwrap());
}
