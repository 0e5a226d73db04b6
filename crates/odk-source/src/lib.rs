//! Boundary to the external issue tracker.
//!
//! This crate defines only the collection reference, the gateway trait, and
//! its error type, plus the live GitHub adapter. No ordering logic and no
//! store access belong here; callers own what happens to fetched records.

use std::fmt;

use async_trait::async_trait;

use odk_schemas::{Issue, IssueDraft};

mod github;

pub use github::GithubGateway;

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// The tracked collection, identified by its org/repo pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub org: String,
    pub repo: String,
}

impl Collection {
    pub fn new(org: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`SourceGateway`] implementation may return.
#[derive(Debug)]
pub enum GatewayError {
    /// Network or transport failure (includes timeouts).
    Transport(String),
    /// The tracker answered with a non-success status.
    Api { status: u16, message: String },
    /// A response payload could not be decoded.
    Decode(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Transport(msg) => write!(f, "transport error: {msg}"),
            GatewayError::Api { status, message } => {
                write!(f, "tracker api error status={status}: {message}")
            }
            GatewayError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

// ---------------------------------------------------------------------------
// SourceGateway trait
// ---------------------------------------------------------------------------

/// Outbound contract to the tracker.
///
/// Object-safe so callers can hold an `Arc<dyn SourceGateway>` without
/// knowing the concrete adapter, and `Send + Sync` for use across task
/// boundaries. The tracker is the source of truth for record content; no
/// retries happen at this layer.
#[async_trait]
pub trait SourceGateway: Send + Sync {
    /// Fetch the collection's current issues, in whatever order the tracker
    /// returns them.
    async fn fetch(&self, collection: &Collection) -> Result<Vec<Issue>, GatewayError>;

    /// Create an issue in the collection and return the tracker's view of
    /// the created record (with its assigned identity).
    async fn create(
        &self,
        collection: &Collection,
        draft: &IssueDraft,
    ) -> Result<Issue, GatewayError>;
}
