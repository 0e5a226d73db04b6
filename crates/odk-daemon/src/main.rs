//! odk-daemon entry point.
//!
//! This file is intentionally thin: it sets up tracing, loads config, builds
//! the shared state, wires middleware, and starts the HTTP server. All route
//! handlers live in `routes.rs`; all shared state types live in `state.rs`.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use odk_daemon::{
    config::DaemonConfig,
    routes, state,
    tunnel::{EnvTunnel, TunnelProvider},
};
use odk_order::PositionStore;
use odk_source::GithubGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (dev convenience). Silent if the file does not
    // exist — production injects env vars directly.
    let _ = dotenvy::dotenv();

    init_tracing();

    // Missing credential aborts here, before any listener binds.
    let cfg = DaemonConfig::from_env()?;

    let store = PositionStore::load(&cfg.snapshot_path)
        .with_context(|| format!("load position snapshot {}", cfg.snapshot_path.display()))?;
    info!(
        entries = store.len(),
        path = %cfg.snapshot_path.display(),
        "position snapshot loaded"
    );

    let gateway = Arc::new(GithubGateway::new(cfg.token.clone(), cfg.api_base.clone())?);
    let shared = Arc::new(state::AppState::new(store, gateway));

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(15));

    let mut app = routes::build_router(Arc::clone(&shared));
    if let Some(dir) = &cfg.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }
    let app = app
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let tunnel = EnvTunnel::new(cfg.public_url.clone());
    match tunnel.public_url(cfg.bind.port()) {
        Some(url) => info!("webhook reachable at {}/api/webhook", url.trim_end_matches('/')),
        None => info!("no public URL configured; webhook reachable at http://{}/api/webhook", cfg.bind),
    }

    info!("odk-daemon listening on http://{}", cfg.bind);
    axum::serve(tokio::net::TcpListener::bind(cfg.bind).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
        "http://localhost:8080",
        "http://127.0.0.1:8080",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(tower_http::cors::Any)
}
