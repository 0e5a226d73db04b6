use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An issue as returned by the external tracker, plus the derived
/// `sort_position` attached at reconciliation time.
///
/// Only the fields the daemon actually reads are modeled; everything else the
/// tracker sends rides along in `rest` and is echoed back verbatim. The
/// tracker stays the source of truth for content, the position snapshot for
/// ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Derived ordering key. Never stored on the record itself; populated
    /// from the position snapshot when a batch is reconciled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_position: Option<f64>,
    /// Passthrough for provider fields the daemon does not model.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl Issue {
    /// Bare record with only the identity set, for tests and fixtures.
    pub fn with_id(id: u64) -> Self {
        Self {
            id,
            number: None,
            title: None,
            state: None,
            body: None,
            sort_position: None,
            rest: Map::new(),
        }
    }
}

/// Outbound issue draft: what a client submits for creation, before the
/// tracker has assigned an identity. `sort_position` here is a request to
/// pin the created record at that key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_position: Option<f64>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Inbound webhook notification from the tracker: an action string plus the
/// affected issue. Anything that fails to parse into this shape is a
/// malformed notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub action: String,
    pub issue: Issue,
}

/// Change-event kinds broadcast to live subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Updated,
    Removed,
}

impl EventKind {
    /// Wire name used for the SSE `event:` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Updated => "updated",
            EventKind::Removed => "removed",
        }
    }
}
