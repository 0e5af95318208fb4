//! `armbridge run` — Peer server, goal listener and control loop in one process.

use std::path::Path;
use std::sync::Arc;

use armbridge_channels::{ConnectionRegistry, ExchangeBridge};
use armbridge_control::{ControlLoop, RobotEnv};
use armbridge_core::event::{DomainEvent, EventBus};
use armbridge_core::goal::GoalSlot;
use armbridge_gateway::{GoalState, start_goal_server, start_peer_server};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::load_config;

/// Command-line overrides applied on top of the loaded config.
#[derive(Debug, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub goal_port: Option<u16>,
}

pub async fn run(path: Option<&Path>, overrides: Overrides) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(path).map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(host) = overrides.host {
        config.bridge.host = host;
    }
    if let Some(port) = overrides.port {
        config.bridge.port = port;
    }
    if let Some(port) = overrides.goal_port {
        config.goal.port = port;
    }
    config.validate()?;

    println!("🦾 armbridge");
    println!("   Peers:    ws://{}", config.bridge.addr());
    println!("   Goals:    http://{}", config.goal.addr());
    println!(
        "   Horizon:  {} steps, then {:?}",
        config.control.horizon, config.control.on_horizon
    );

    let events = Arc::new(EventBus::default());
    let registry = Arc::new(ConnectionRegistry::new().with_events(events.clone()));
    let goals = Arc::new(GoalSlot::new());

    let bridge = Arc::new(ExchangeBridge::from_config(&config.bridge, registry.clone()));
    let env = RobotEnv::from_config(bridge, &config.control);
    let mut control =
        ControlLoop::new(env, goals.clone(), config.control.clone()).with_events(events.clone());

    spawn_event_logger(events.subscribe());

    let peer_server = start_peer_server(&config.bridge, registry);
    let goal_server = start_goal_server(&config.goal, GoalState::new(goals, events));

    tokio::select! {
        result = peer_server => result?,
        result = goal_server => result?,
        result = control.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    let stats = control.stats();
    info!(
        resets = stats.resets,
        steps = stats.steps,
        goals = stats.goals_consumed,
        connection_losses = stats.connection_losses,
        "Control loop stopped"
    );

    Ok(())
}

/// Mirror domain events into the log at debug level.
fn spawn_event_logger(mut rx: broadcast::Receiver<Arc<DomainEvent>>) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => debug!(event = event.name(), detail = ?event, "Domain event"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
