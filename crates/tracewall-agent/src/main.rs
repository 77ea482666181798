//! TraceWall demo agent.
//!
//! Serves `/v1/echo` behind the interception middleware, plus `/healthz`
//! and `/metrics`. Config is read from `tracewall.yaml`.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use tracewall_agent::{config, router, Controller, TracingSink};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "tracewall-agent failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_from_file("tracewall.yaml")?;
    let listen: SocketAddr = cfg.service.listen.parse()?;

    let controller = Arc::new(Controller::from_config(&cfg, Arc::new(TracingSink))?);
    let app = router::build_router(controller);

    tracing::info!(%listen, blocking = cfg.blocking.enabled, rules = cfg.blocking.rules.len(), "tracewall-agent starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
