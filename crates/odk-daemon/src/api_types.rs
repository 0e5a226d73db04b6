//! Response types for odk-daemon HTTP endpoints.
//!
//! These types are `Serialize` so they can be JSON-encoded by Axum and
//! decoded by tests. Issue payloads themselves live in `odk-schemas`; no
//! business logic lives here.

use serde::Serialize;

// ---------------------------------------------------------------------------
// /api/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

/// Uniform JSON error body for refused or failed requests.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
