//! Shared runtime state for odk-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum; this module owns
//! nothing async itself. Store access goes through one `RwLock` so a
//! reconciliation pass (extremes read + assignment loop + persist) is a
//! single critical section and snapshot writes never interleave.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};

use odk_order::PositionStore;
use odk_schemas::{EventKind, Issue};
use odk_source::SourceGateway;

// ---------------------------------------------------------------------------
// BusMsg — SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug)]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Change { kind: EventKind, issue: Issue },
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Explicit pub/sub service: fan-out of change events to every subscriber
/// currently attached. At-most-once, best-effort; no replay for subscribers
/// that connect afterward.
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<BusMsg>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// A bus with no subscribers is not an error.
    pub fn emit(&self, kind: EventKind, issue: Issue) {
        let _ = self.tx.send(BusMsg::Change { kind, issue });
    }

    pub fn heartbeat(&self, ts_millis: i64) {
        let _ = self.tx.send(BusMsg::Heartbeat { ts_millis });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMsg> {
        self.tx.subscribe()
    }
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in the health response.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared handle injected into every Axum handler.
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: EventBroadcaster,
    /// Static build metadata.
    pub build: BuildInfo,
    /// Sole source of truth for ordering.
    pub positions: RwLock<PositionStore>,
    /// Outbound tracker boundary.
    pub gateway: Arc<dyn SourceGateway>,
}

impl AppState {
    pub fn new(store: PositionStore, gateway: Arc<dyn SourceGateway>) -> Self {
        Self {
            bus: EventBroadcaster::new(1024),
            build: BuildInfo {
                service: "odk-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            positions: RwLock::new(store),
            gateway,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Spawn a background task that emits a heartbeat on the bus every
/// `interval`, so idle SSE connections observe traffic.
pub fn spawn_heartbeat(bus: EventBroadcaster, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            bus.heartbeat(chrono::Utc::now().timestamp_millis());
        }
    });
}
