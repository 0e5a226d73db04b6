//! Axum router and all HTTP handlers for odk-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.
//!
//! Every handler follows the same ordering: read body → mutate store →
//! persist → respond, with change events broadcast fire-and-forget.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post, put},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info, warn};

use odk_order::StoreMutation;
use odk_schemas::{EventKind, Issue, IssueDraft, Notification};
use odk_source::Collection;

use crate::{
    api_types::{ErrorResponse, HealthResponse},
    state::{AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing, static fallback) are **not** applied
/// here; `main.rs` attaches them after this call so tests can use the bare
/// router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/events", get(stream))
        .route(
            "/api/github/repos/:org/:repo/issues",
            get(list_issues).post(create_issue),
        )
        .route("/api/github/repos/:org/:repo/issues/:id", put(reposition_issue))
        .route("/api/webhook", post(webhook))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /api/github/repos/:org/:repo/issues
// ---------------------------------------------------------------------------

/// Fetch the collection from the tracker and reconcile it against the
/// position store: every issue comes back with a `sort_position`, ascending.
pub(crate) async fn list_issues(
    State(st): State<Arc<AppState>>,
    Path((org, repo)): Path<(String, String)>,
) -> Response {
    let collection = Collection::new(org, repo);
    let batch = match st.gateway.fetch(&collection).await {
        Ok(batch) => batch,
        Err(err) => {
            warn!(%err, org = %collection.org, repo = %collection.repo, "tracker fetch failed");
            return (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response();
        }
    };

    // One write guard for the whole pass: extremes read, assignment loop,
    // persist. Concurrent passes must not interleave.
    let outcome = {
        let mut store = st.positions.write().await;
        match odk_order::reconcile(&mut store, batch) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%err, "reconcile pass failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: err.to_string(),
                    }),
                )
                    .into_response();
            }
        }
    };

    if outcome.newly_assigned > 0 {
        info!(
            assigned = outcome.newly_assigned,
            rebalanced = outcome.rebalanced,
            "ordering keys assigned"
        );
    }
    (StatusCode::OK, Json(outcome.issues)).into_response()
}

// ---------------------------------------------------------------------------
// POST /api/github/repos/:org/:repo/issues
// ---------------------------------------------------------------------------

/// Forward the issue to the tracker; if the request body carried a
/// `sort_position`, store it for the identity the tracker assigned.
pub(crate) async fn create_issue(
    State(st): State<Arc<AppState>>,
    Path((org, repo)): Path<(String, String)>,
    Json(draft): Json<IssueDraft>,
) -> Response {
    let collection = Collection::new(org, repo);
    let requested_position = draft.sort_position;

    let created = match st.gateway.create(&collection, &draft).await {
        Ok(created) => created,
        Err(err) => {
            warn!(%err, org = %collection.org, repo = %collection.repo, "tracker create failed");
            return (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response();
        }
    };

    if let Some(key) = requested_position {
        let mut store = st.positions.write().await;
        store.set(created.id, key);
        if let Err(err) = store.persist() {
            warn!(%err, id = created.id, "position snapshot persist failed; in-memory mapping stays authoritative");
        }
        info!(id = created.id, key, "created issue pinned to requested position");
    }

    (StatusCode::OK, Json(created)).into_response()
}

// ---------------------------------------------------------------------------
// PUT /api/github/repos/:org/:repo/issues/:id
// ---------------------------------------------------------------------------

/// Reposition one identity to the key carried in the body, persist, echo the
/// body, and broadcast `updated`.
pub(crate) async fn reposition_issue(
    State(st): State<Arc<AppState>>,
    Path((_org, _repo, id)): Path<(String, String, u64)>,
    Json(body): Json<Issue>,
) -> Response {
    let Some(key) = body.sort_position else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "sort_position field is required".to_string(),
            }),
        )
            .into_response();
    };

    {
        let mut store = st.positions.write().await;
        store.set(id, key);
        if let Err(err) = store.persist() {
            warn!(%err, id, "position snapshot persist failed; in-memory mapping stays authoritative");
        }
    }

    info!(id, key, "issue repositioned");
    st.bus.emit(EventKind::Updated, body.clone());
    (StatusCode::OK, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// POST /api/webhook
// ---------------------------------------------------------------------------

/// Tracker notification endpoint. Always acks 200 with an empty body — a
/// malformed or unknown notification is logged and dropped, never bounced,
/// so the provider does not retry indefinitely.
pub(crate) async fn webhook(State(st): State<Arc<AppState>>, body: String) -> StatusCode {
    handle_notification(&st, &body).await;
    StatusCode::OK
}

async fn handle_notification(st: &AppState, body: &str) {
    let notification: Notification = match serde_json::from_str(body) {
        Ok(n) => n,
        Err(err) => {
            warn!(%err, "malformed webhook notification dropped");
            return;
        }
    };

    let Some((kind, mutation)) = odk_order::translate(&notification.action) else {
        warn!(action = %notification.action, "unknown webhook action ignored");
        return;
    };

    let mut issue = notification.issue;
    match mutation {
        StoreMutation::Remove => {
            let mut store = st.positions.write().await;
            if store.remove(issue.id) {
                if let Err(err) = store.persist() {
                    warn!(%err, id = issue.id, "position snapshot persist failed; in-memory mapping stays authoritative");
                }
            }
        }
        StoreMutation::AssignFirst => {
            let mut store = st.positions.write().await;
            match odk_order::first_position_key(&mut store) {
                Ok(key) => {
                    store.set(issue.id, key);
                    issue.sort_position = Some(key);
                    if let Err(err) = store.persist() {
                        warn!(%err, id = issue.id, "position snapshot persist failed; in-memory mapping stays authoritative");
                    }
                }
                Err(err) => {
                    error!(%err, id = issue.id, "first-position assignment failed");
                    return;
                }
            }
        }
        StoreMutation::NoChange => {}
    }

    info!(action = %notification.action, id = issue.id, event = kind.as_str(), "webhook translated");
    st.bus.emit(kind, issue);
}

// ---------------------------------------------------------------------------
// GET /api/events  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(BusMsg::Heartbeat { ts_millis }) => {
                Some(Ok(Event::default().event("heartbeat").data(ts_millis.to_string())))
            }
            Ok(BusMsg::Change { kind, issue }) => {
                let data = serde_json::to_string(&issue).ok()?;
                Some(Ok(Event::default().event(kind.as_str()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
