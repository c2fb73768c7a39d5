//! Read-only admin HTTP surface.
//!
//! ```text
//! GET /status                   → version and pool counts
//! GET /pools/health             → HealthSnapshot
//! GET /replica/route/{tenant}   → read replica, shard, primary
//! ```

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::dispatch::ResilientInvoker;
use crate::routing::ReplicaRouter;
use self::handlers::*;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub invoker: Arc<ResilientInvoker>,
    pub replicas: Option<ReplicaRouter>,
}

pub fn admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/pools/health", get(get_pool_health))
        .route("/replica/route/{tenant_id}", get(get_replica_route))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve the admin API on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin server starting");

    axum::serve(listener, admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!("Admin server stopped");
    Ok(())
}
