//! Public-address seam for the webhook endpoint.
//!
//! The daemon only needs a URL to print at startup so the operator can point
//! the tracker's webhook at it. Exposing the port is someone else's job; the
//! default implementation reads whatever the operator configured.

pub trait TunnelProvider: Send + Sync {
    /// Public base URL under which the local port is reachable, if any.
    fn public_url(&self, port: u16) -> Option<String>;
}

/// Environment-configured "tunnel": returns the operator-supplied public URL
/// as-is. No live tunnel client is started.
pub struct EnvTunnel {
    configured: Option<String>,
}

impl EnvTunnel {
    pub fn new(configured: Option<String>) -> Self {
        Self { configured }
    }
}

impl TunnelProvider for EnvTunnel {
    fn public_url(&self, _port: u16) -> Option<String> {
        self.configured.clone()
    }
}
