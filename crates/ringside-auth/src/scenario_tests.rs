//! End-to-end flows across store, manager, wrapper, guard and keepalive.

#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use ringside_core::{ClientConfig, FileStorage, Role, SessionStore};

use crate::api::REFRESH_PATH;
use crate::testing::{
    FakeTransport, Harness, RecordingNavigator, fresh_token, profile, refresh_success,
    requires_login, session, stale_token,
};
use crate::{
    ApiResponse, AuthError, AuthManager, AuthedClient, GuardView, Keepalive, Navigator,
    RouteGuard, Transport,
};

/// Answers refreshes with `token`, everything else with 200.
fn backend(token: String) -> FakeTransport {
    FakeTransport::new(move |req| {
        if req.path == REFRESH_PATH {
            Ok(refresh_success(&token, &profile("u1", Role::Admin)))
        } else {
            Ok(ApiResponse::new(200, "{}"))
        }
    })
}

#[tokio::test]
async fn fresh_token_needs_no_network() {
    let t1 = fresh_token("u1");
    let h = Harness::new(backend(fresh_token("unused")), Some(session(&t1, Role::Admin))).await;

    assert_eq!(h.manager.ensure_valid_token().await.unwrap(), Some(t1.clone()));
    let client = AuthedClient::new(Arc::clone(&h.manager));
    client.get("/rankings").await.unwrap();

    assert_eq!(h.transport.refresh_count(), 0);
    assert_eq!(h.transport.requests()[0].bearer_token(), Some(t1.as_str()));
}

#[tokio::test(start_paused = true)]
async fn concurrent_calls_near_expiry_share_one_refresh() {
    let t1 = stale_token("u1");
    let t2 = fresh_token("u1");
    let h = Harness::new(
        backend(t2.clone()).with_delay(Duration::from_millis(50)),
        Some(session(&t1, Role::User)),
    )
    .await;
    let client = AuthedClient::new(Arc::clone(&h.manager));

    let calls: Vec<_> = ["/events", "/athletes", "/results"]
        .into_iter()
        .map(|path| {
            let client = client.clone();
            tokio::spawn(async move { client.get(path).await })
        })
        .collect();
    for call in calls {
        assert_eq!(call.await.unwrap().unwrap().status, 200);
    }

    assert_eq!(h.transport.refresh_count(), 1);
    let api_calls: Vec<_> = h
        .transport
        .requests()
        .into_iter()
        .filter(|r| r.path != REFRESH_PATH)
        .collect();
    assert_eq!(api_calls.len(), 3);
    for call in &api_calls {
        assert_eq!(call.bearer_token(), Some(t2.as_str()));
    }
    let stored = h.store.session().unwrap();
    assert_eq!(stored.token(), t2);
    assert_eq!(stored.role(), Role::Admin);
}

#[tokio::test]
async fn forced_relogin_on_refresh() {
    let h = Harness::new(
        FakeTransport::new(|_| Ok(requires_login())),
        Some(session(&stale_token("u1"), Role::User)),
    )
    .await;
    let client = AuthedClient::new(Arc::clone(&h.manager));

    let err = client.get("/events").await.unwrap_err();

    assert!(matches!(err, AuthError::AuthenticationFailed(_)));
    assert_eq!(h.store.session(), None);
    assert_eq!(h.navigator.visits(), vec!["/login"]);
    // Only the refresh went out.
    assert_eq!(h.transport.requests().len(), 1);
}

#[tokio::test]
async fn wrapper_never_sends_a_stale_token() {
    let t1 = stale_token("u1");
    let h = Harness::new(backend(fresh_token("u1")), Some(session(&t1, Role::User))).await;
    let client = AuthedClient::new(Arc::clone(&h.manager));

    for path in ["/a", "/b", "/c"] {
        client.get(path).await.unwrap();
    }

    for request in h.transport.requests() {
        if request.path != REFRESH_PATH {
            assert_ne!(request.bearer_token(), Some(t1.as_str()));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn logout_during_wrapped_refresh_stays_logged_out() {
    let h = Harness::new(
        backend(fresh_token("u1")).with_delay(Duration::from_millis(100)),
        Some(session(&stale_token("u1"), Role::User)),
    )
    .await;
    let client = AuthedClient::new(Arc::clone(&h.manager));

    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.get("/events").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.manager.logout(None);

    assert!(pending.await.unwrap().is_err());
    assert_eq!(h.store.session(), None);
}

#[tokio::test(start_paused = true)]
async fn relogin_during_wrapped_refresh_keeps_new_session() {
    let h = Harness::new(
        backend(fresh_token("u1")).with_delay(Duration::from_millis(100)),
        Some(session(&stale_token("u1"), Role::User)),
    )
    .await;
    let client = AuthedClient::new(Arc::clone(&h.manager));

    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.get("/events").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let u2 = fresh_token("u2");
    h.store.set_session(session(&u2, Role::Admin));

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, AuthError::AuthenticationFailed(_)));
    assert_eq!(h.store.token(), Some(u2));
    assert!(h.navigator.visits().is_empty());
}

#[tokio::test]
async fn persisted_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let t1 = fresh_token("u1");

    {
        let store = SessionStore::new(Arc::new(FileStorage::new(dir.path())));
        store.hydrate().await.unwrap();
        store.set_session(session(&t1, Role::Admin));
    }

    let store = SessionStore::new(Arc::new(FileStorage::new(dir.path())));
    let navigator = Arc::new(RecordingNavigator::default());
    let manager = Arc::new(AuthManager::new(
        store.clone(),
        Arc::new(FakeTransport::ok()) as Arc<dyn Transport>,
        Arc::clone(&navigator) as Arc<dyn Navigator>,
        &ClientConfig::default(),
    ));
    let mut guard = RouteGuard::new(Arc::clone(&manager), Some(Role::Admin));

    assert_eq!(guard.poll().await, GuardView::Loading);
    store.hydrate().await.unwrap();
    assert_eq!(guard.poll().await, GuardView::Protected);
    assert_eq!(store.token(), Some(t1));
    assert!(navigator.visits().is_empty());
}

#[tokio::test(start_paused = true)]
async fn keepalive_and_requests_share_the_refresh() {
    let t2 = fresh_token("u1");
    let h = Harness::new(
        backend(t2.clone()).with_delay(Duration::from_millis(50)),
        Some(session(&stale_token("u1"), Role::User)),
    )
    .await;
    let client = AuthedClient::new(Arc::clone(&h.manager));
    let keepalive = Keepalive::spawn(Arc::clone(&h.manager), Duration::from_secs(150));

    // Land a request on the keepalive's tick while its refresh is in flight.
    tokio::time::sleep(Duration::from_millis(150_010)).await;
    client.get("/events").await.unwrap();

    assert_eq!(h.transport.refresh_count(), 1);
    assert_eq!(h.store.token(), Some(t2));
    keepalive.stop().await;
}
