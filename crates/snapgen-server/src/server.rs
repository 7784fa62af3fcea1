//! Server and replay entry points

use crate::routes::routes;
use crate::state::{process_event, AppState, EventReport};
use anyhow::Context;
use snapgen_core::{PushEvent, SnapgenConfig, SnapshotPipeline};
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;

/// Serve webhooks until `shutdown` resolves
///
/// # Errors
/// Fails if the HTTP client cannot be built, the snapshot directory cannot
/// be created, or the address cannot be bound.
pub async fn serve(
    config: SnapgenConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let pipeline = SnapshotPipeline::from_config(&config).context("build HTTP client")?;
    let snapshot_root = config.snapshot_root();
    tokio::fs::create_dir_all(&snapshot_root)
        .await
        .with_context(|| format!("create snapshot directory {}", snapshot_root.display()))?;

    let state = AppState::new(pipeline);
    let addr = SocketAddr::new(config.bind_address, config.port);
    let (bound, server) = warp::serve(routes(state, config.public_dir.clone()))
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .with_context(|| format!("bind {addr}"))?;

    tracing::info!(
        address = %bound,
        public_dir = %config.public_dir.display(),
        "snapgen listening"
    );
    server.await;
    tracing::info!("snapgen stopped");
    Ok(())
}

/// Run the pipeline once for a push payload stored on disk
///
/// # Errors
/// Fails if the payload cannot be read or parsed, or the HTTP client cannot
/// be built. Pipeline failures are reported in the returned report.
pub async fn replay(config: &SnapgenConfig, payload: &Path) -> anyhow::Result<EventReport> {
    let body = tokio::fs::read(payload)
        .await
        .with_context(|| format!("read payload {}", payload.display()))?;
    let event = PushEvent::from_slice(&body)?;
    let pipeline = SnapshotPipeline::from_config(config).context("build HTTP client")?;
    Ok(process_event(&pipeline, &event).await)
}
