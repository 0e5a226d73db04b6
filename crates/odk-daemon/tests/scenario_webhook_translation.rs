//! Webhook translation scenarios: store mutation + broadcast per action,
//! and the always-ack contract for malformed or unknown notifications.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tokio::sync::broadcast::error::TryRecvError;
use tower::ServiceExt; // oneshot

use odk_daemon::routes;
use odk_daemon::state::{AppState, BusMsg};
use odk_order::PositionStore;
use odk_schemas::{EventKind, Issue, IssueDraft};
use odk_source::{Collection, GatewayError, SourceGateway};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The webhook path never touches the tracker; a refusing gateway proves it.
struct RefusingGateway;

#[async_trait]
impl SourceGateway for RefusingGateway {
    async fn fetch(&self, _collection: &Collection) -> Result<Vec<Issue>, GatewayError> {
        Err(GatewayError::Transport("not wired in this test".to_string()))
    }

    async fn create(
        &self,
        _collection: &Collection,
        _draft: &IssueDraft,
    ) -> Result<Issue, GatewayError> {
        Err(GatewayError::Transport("not wired in this test".to_string()))
    }
}

fn make_state(dir: &tempfile::TempDir) -> Arc<AppState> {
    let store = PositionStore::load(dir.path().join("issues.json")).unwrap();
    Arc::new(AppState::new(store, Arc::new(RefusingGateway)))
}

async fn post_webhook(st: Arc<AppState>, body: &str) -> StatusCode {
    let req = Request::builder()
        .method("POST")
        .uri("/api/webhook")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();
    let resp = routes::build_router(st)
        .oneshot(req)
        .await
        .expect("oneshot failed");
    let status = resp.status();
    // Empty acknowledgement body.
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.is_empty(), "webhook ack carries no body");
    status
}

// ---------------------------------------------------------------------------
// closed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn closed_removes_the_entry_and_emits_removed() {
    let dir = tempfile::tempdir().unwrap();
    let st = make_state(&dir);
    st.positions.write().await.set(7, 3.0);
    let mut rx = st.bus.subscribe();

    let status = post_webhook(Arc::clone(&st), r#"{"action":"closed","issue":{"id":7}}"#).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(st.positions.read().await.get(7), None);
    assert!(dir.path().join("issues.json").exists(), "removal is persisted");

    match rx.try_recv().expect("one event expected") {
        BusMsg::Change { kind, issue } => {
            assert_eq!(kind, EventKind::Removed);
            assert_eq!(issue.id, 7);
        }
        other => panic!("unexpected bus message: {other:?}"),
    }
}

#[tokio::test]
async fn closing_an_unknown_identity_still_emits_removed() {
    let dir = tempfile::tempdir().unwrap();
    let st = make_state(&dir);
    let mut rx = st.bus.subscribe();

    let status = post_webhook(Arc::clone(&st), r#"{"action":"closed","issue":{"id":404}}"#).await;
    assert_eq!(status, StatusCode::OK);

    assert!(matches!(
        rx.try_recv(),
        Ok(BusMsg::Change { kind: EventKind::Removed, .. })
    ));
}

// ---------------------------------------------------------------------------
// opened / reopened
// ---------------------------------------------------------------------------

#[tokio::test]
async fn opened_assigns_a_first_position_key_and_emits_created() {
    let dir = tempfile::tempdir().unwrap();
    let st = make_state(&dir);
    {
        let mut store = st.positions.write().await;
        store.set(1, 0.0);
        store.set(2, 100.0);
    }
    let mut rx = st.bus.subscribe();

    let status = post_webhook(Arc::clone(&st), r#"{"action":"opened","issue":{"id":9}}"#).await;
    assert_eq!(status, StatusCode::OK);

    let store = st.positions.read().await;
    let key = store.get(9).expect("entry created");
    assert!(key < 0.0, "new issue sorts before every known record");

    match rx.try_recv().expect("one event expected") {
        BusMsg::Change { kind, issue } => {
            assert_eq!(kind, EventKind::Created);
            assert_eq!(issue.id, 9);
            assert_eq!(issue.sort_position, Some(key), "payload carries the new key");
        }
        other => panic!("unexpected bus message: {other:?}"),
    }
}

#[tokio::test]
async fn reopened_identity_is_treated_as_new() {
    let dir = tempfile::tempdir().unwrap();
    let st = make_state(&dir);
    {
        let mut store = st.positions.write().await;
        store.set(1, 0.0);
        store.set(5, 50.0);
    }

    let _ = post_webhook(Arc::clone(&st), r#"{"action":"closed","issue":{"id":5}}"#).await;
    assert_eq!(st.positions.read().await.get(5), None);

    let _ = post_webhook(Arc::clone(&st), r#"{"action":"reopened","issue":{"id":5}}"#).await;
    let key = st.positions.read().await.get(5).expect("fresh entry");
    assert_ne!(key, 50.0, "old key is not resurrected");
    assert!(key < 0.0, "fresh first-position key");
}

// ---------------------------------------------------------------------------
// edited
// ---------------------------------------------------------------------------

#[tokio::test]
async fn edited_emits_updated_without_touching_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let st = make_state(&dir);
    let mut rx = st.bus.subscribe();

    let status = post_webhook(
        Arc::clone(&st),
        r#"{"action":"edited","issue":{"id":3,"title":"new title"}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert!(st.positions.read().await.is_empty(), "no store mutation");
    assert!(matches!(
        rx.try_recv(),
        Ok(BusMsg::Change { kind: EventKind::Updated, .. })
    ));
}

// ---------------------------------------------------------------------------
// Unknown / malformed notifications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_action_acks_200_and_emits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let st = make_state(&dir);
    let mut rx = st.bus.subscribe();

    let status = post_webhook(Arc::clone(&st), r#"{"action":"labeled","issue":{"id":3}}"#).await;
    assert_eq!(status, StatusCode::OK);

    assert!(st.positions.read().await.is_empty());
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn malformed_notification_still_acks_200() {
    let dir = tempfile::tempdir().unwrap();
    let st = make_state(&dir);
    let mut rx = st.bus.subscribe();

    for body in ["{not json", r#"{"action":"opened"}"#, r#"{"action":"opened","issue":{}}"#] {
        let status = post_webhook(Arc::clone(&st), body).await;
        assert_eq!(status, StatusCode::OK, "always acknowledged: {body}");
    }

    assert!(st.positions.read().await.is_empty(), "nothing was stored");
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}
