//! Environment-backed daemon configuration.
//!
//! The tracker credential is the only required value; everything else has a
//! sensible default. A missing credential is fatal before any listener
//! binds.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Result};

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Fixed tracker credential forwarded on every outbound call.
    pub token: String,
    /// Listen address.
    pub bind: SocketAddr,
    /// Path of the position snapshot file.
    pub snapshot_path: PathBuf,
    /// Tracker API base URL (overridable for local stubs).
    pub api_base: String,
    /// Operator-supplied public base URL for the webhook, if any.
    pub public_url: Option<String>,
    /// Directory served as static assets, if any.
    pub static_dir: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        let token = match std::env::var("ODK_GITHUB_TOKEN") {
            Ok(t) if !t.trim().is_empty() => t,
            _ => bail!(
                "ODK_GITHUB_TOKEN is not set; the tracker credential is required at startup"
            ),
        };

        let bind = std::env::var("ODK_DAEMON_ADDR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));

        let snapshot_path = std::env::var("ODK_SNAPSHOT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("issues.json"));

        let api_base = std::env::var("ODK_GITHUB_API")
            .unwrap_or_else(|_| "https://api.github.com".to_string());

        let public_url = std::env::var("ODK_PUBLIC_URL").ok().filter(|s| !s.is_empty());
        let static_dir = std::env::var("ODK_STATIC_DIR").ok().map(PathBuf::from);

        Ok(Self {
            token,
            bind,
            snapshot_path,
            api_base,
            public_url,
            static_dir,
        })
    }
}
