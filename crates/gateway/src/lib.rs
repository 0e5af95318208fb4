//! Network listeners for armbridge.
//!
//! Two independent servers, both built on Axum:
//!
//! - the **peer server** accepts WebSocket connections from the robot side
//!   and hands them to the connection registry ([`peer`])
//! - the **goal server** accepts asynchronous goal updates over HTTP and
//!   stores them in the goal slot ([`goal`])

pub mod goal;
pub mod peer;

use std::sync::Arc;

use armbridge_channels::ConnectionRegistry;
use armbridge_config::{BridgeConfig, GoalConfig};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

pub use goal::{GoalState, goal_router};
pub use peer::peer_router;

/// Bind the peer WebSocket server and serve until the task is dropped.
pub async fn start_peer_server(
    config: &BridgeConfig,
    registry: Arc<ConnectionRegistry>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.addr()).await?;
    info!(addr = %listener.local_addr()?, "Peer WebSocket server listening");
    serve(listener, peer_router(registry)).await
}

/// Bind the goal HTTP server and serve until the task is dropped.
pub async fn start_goal_server(config: &GoalConfig, state: GoalState) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.addr()).await?;
    info!(addr = %listener.local_addr()?, "Goal listener running");
    serve(listener, goal_router(state)).await
}

/// Serve `router` on an already bound listener.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    axum::serve(listener, router).await
}
